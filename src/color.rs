/// One stored pixel: three channel bytes in the order of its format.
pub type Pixel = [u8; 3];

pub const BYTES_PER_PIXEL: usize = 3;

/// Byte offset of the red, green and blue channel inside a stored pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelOrder {
    red: usize,
    green: usize,
    blue: usize,
}

impl ChannelOrder {
    pub const fn new(red: usize, green: usize, blue: usize) -> Self {
        Self { red, green, blue }
    }

    fn offsets(&self) -> [usize; 3] {
        [self.red, self.green, self.blue]
    }
}

pub fn reorder(pixel: Pixel, from: ChannelOrder, to: ChannelOrder) -> Pixel {
    if from == to {
        return pixel;
    }
    let mut reordered = [0; BYTES_PER_PIXEL];
    for (source, target) in from.offsets().into_iter().zip(to.offsets()) {
        reordered[target] = pixel[source];
    }
    reordered
}

/// Reorders every pixel crossing from one format into another.
#[derive(Clone, Copy, Debug)]
pub struct ChannelReorderer {
    from: ChannelOrder,
    to: ChannelOrder,
}

impl ChannelReorderer {
    pub fn new(from: ChannelOrder, to: ChannelOrder) -> Self {
        Self { from, to }
    }

    pub fn apply(&self, pixel: Pixel) -> Pixel {
        reorder(pixel, self.from, self.to)
    }
}
