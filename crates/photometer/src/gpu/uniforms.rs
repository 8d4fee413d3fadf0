use bytemuck::{Pod, Zeroable};

use crate::types::SampleRegion;

/// Mirrors the `CropArea` std140 block of the crop vertex program.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct CropUniform {
    pub area: [f32; 4],
}

impl CropUniform {
    pub fn from_region(region: &SampleRegion) -> Self {
        Self {
            area: region.crop_area(),
        }
    }
}
