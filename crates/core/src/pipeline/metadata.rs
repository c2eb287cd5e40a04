use serde::{Deserialize, Serialize};

use crate::scan::Crop;
use crate::session::FrameCounter;

/// Film and development details written into every scanned file.
///
/// A session holds one template; each file gets a copy with its own exposure
/// number and crop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaData {
    pub exposure_number: Option<i32>,
    pub lens_serial_number: String,
    pub roll_id: String,
    pub film_maker: String,
    pub film: String,
    pub film_alias: String,
    pub film_grain: Option<u32>,
    pub film_type: String,
    pub developer: String,
    pub develop_process: String,
    pub developer_maker: String,
    pub developer_dilution: String,
    pub develop_time: String,
    pub lab: String,
    pub lab_address: String,
    pub filter: String,
    pub crop: Option<Crop>,
}

impl MetaData {
    pub fn with_frame_count(&self, frame: FrameCounter) -> Self {
        Self {
            exposure_number: Some(frame.index()),
            ..self.clone()
        }
    }

    pub fn with_crop(&self, crop: Option<Crop>) -> Self {
        Self {
            crop,
            ..self.clone()
        }
    }

    /// Tag name and value for every field that has content, in writing order.
    ///
    /// [`MetadataTagger`](super::MetadataTagger) implementations write these
    /// pairs rather than reading the fields one by one, so empty fields and
    /// the crop encoding are handled in one place.
    pub fn tag_pairs(&self) -> Vec<(&'static str, String)> {
        let text_fields = [
            ("LensSerialNumber", &self.lens_serial_number),
            ("RollId", &self.roll_id),
            ("FilmMaker", &self.film_maker),
            ("Film", &self.film),
            ("FilmAlias", &self.film_alias),
        ];
        let process_fields = [
            ("FilmType", &self.film_type),
            ("Developer", &self.developer),
            ("DevelopProcess", &self.develop_process),
            ("DeveloperMaker", &self.developer_maker),
            ("DeveloperDilution", &self.developer_dilution),
            ("DevelopTime", &self.develop_time),
            ("Lab", &self.lab),
            ("LabAddress", &self.lab_address),
            ("Filter", &self.filter),
        ];

        let mut pairs = Vec::new();
        if let Some(exposure) = self.exposure_number {
            pairs.push(("ExposureNumber", exposure.to_string()));
        }
        pairs.extend(
            text_fields
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(tag, value)| (*tag, value.to_string())),
        );
        if let Some(grain) = self.film_grain {
            pairs.push(("FilmGrain", grain.to_string()));
        }
        pairs.extend(
            process_fields
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(tag, value)| (*tag, value.to_string())),
        );
        if let Some((x1, y1, x2, y2)) = self.crop {
            pairs.push(("DefaultUserCrop", format!("{} {} {} {}", x1, y1, x2, y2)));
        }
        pairs
    }
}
