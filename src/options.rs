//! §6 decoder options, mirroring `WebPDecoderOptions`: cropping, scaling,
//! and the filter/upsample bypass flags.

#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderOptions {
    pub use_cropping: bool,
    pub crop_left: u32,
    pub crop_top: u32,
    pub crop_width: u32,
    pub crop_height: u32,

    pub use_scaling: bool,
    pub scaled_width: u32,
    pub scaled_height: u32,

    pub bypass_filtering: bool,
    pub no_fancy_upsampling: bool,
}

impl DecoderOptions {
    pub fn with_crop(mut self, left: u32, top: u32, width: u32, height: u32) -> Self {
        self.use_cropping = true;
        self.crop_left = left;
        self.crop_top = top;
        self.crop_width = width;
        self.crop_height = height;
        self
    }

    pub fn with_scale(mut self, width: u32, height: u32) -> Self {
        self.use_scaling = true;
        self.scaled_width = width;
        self.scaled_height = height;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_do_nothing_special() {
        let o = DecoderOptions::default();
        assert!(!o.use_cropping);
        assert!(!o.use_scaling);
        assert!(!o.bypass_filtering);
    }

    #[test]
    fn builder_methods_set_expected_fields() {
        let o = DecoderOptions::default().with_crop(1, 2, 3, 4).with_scale(10, 20);
        assert!(o.use_cropping);
        assert_eq!((o.crop_left, o.crop_top, o.crop_width, o.crop_height), (1, 2, 3, 4));
        assert!(o.use_scaling);
        assert_eq!((o.scaled_width, o.scaled_height), (10, 20));
    }
}
