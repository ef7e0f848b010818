use serde::{Deserialize, Serialize};

/// One tyre dimension (front or rear side of a fitment).
///
/// Exactly one of `width_mm`/`width_inch` is populated; absent values are
/// omitted from the persisted JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "widthMM", skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<f64>,
    #[serde(rename = "widthInch", skip_serializing_if = "Option::is_none")]
    pub width_inch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rim: Option<i32>,
    #[serde(rename = "loadIndex", skip_serializing_if = "Option::is_none")]
    pub load_index: Option<i32>,
    #[serde(rename = "loadIndex2", skip_serializing_if = "Option::is_none")]
    pub load_index2: Option<i32>,
    #[serde(rename = "speedIndex", skip_serializing_if = "Option::is_none")]
    pub speed_index: Option<String>,
    #[serde(rename = "aspectRatio", skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<i32>,
}

impl Dimension {
    /// The tuple that decides whether front and rear count as the same
    /// specification.
    fn comparable(&self) -> (Option<i32>, Option<f64>, Option<f64>, Option<i32>, &Option<String>, Option<i32>) {
        (
            self.aspect_ratio,
            self.width_mm,
            self.width_inch,
            self.load_index,
            &self.speed_index,
            self.rim,
        )
    }
}

/// Front/rear pair plus the derived mixed-fitment flag, stored as one JSON
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "mixedFitment")]
    pub mixed_fitment: bool,
    pub front: Dimension,
    pub rear: Dimension,
}

impl Dimensions {
    pub fn new(front: Dimension, rear: Dimension) -> Self {
        let mixed_fitment = front.comparable() != rear.comparable();
        Self {
            mixed_fitment,
            front,
            rear,
        }
    }
}

/// Recommended pressure per axle side, bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxlePressure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rear: Option<f64>,
}

/// A tyre fitment attached to a vehicle. Pressures and dimensions are
/// replaced wholesale by later imports of the same fitment id.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitment {
    pub id: String,
    pub vehicle_id: String,
    pub highway_pressure: AxlePressure,
    pub normal_pressure: AxlePressure,
    pub dimensions: Dimensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimension() -> Dimension {
        Dimension {
            width_mm: Some(175.0),
            width_inch: None,
            rim: Some(14),
            load_index: Some(82),
            load_index2: None,
            speed_index: Some("H".to_string()),
            aspect_ratio: Some(65),
        }
    }

    #[test]
    fn test_equal_sides_are_not_mixed() {
        let dims = Dimensions::new(dimension(), dimension());
        assert!(!dims.mixed_fitment);
    }

    #[test]
    fn test_any_differing_field_is_mixed() {
        let mut rear = dimension();
        rear.rim = Some(15);
        assert!(Dimensions::new(dimension(), rear).mixed_fitment);

        let mut rear = dimension();
        rear.speed_index = Some("V".to_string());
        assert!(Dimensions::new(dimension(), rear).mixed_fitment);

        let mut rear = dimension();
        rear.width_mm = None;
        rear.width_inch = Some(6.8);
        assert!(Dimensions::new(dimension(), rear).mixed_fitment);
    }

    #[test]
    fn test_load_index2_does_not_affect_mixed_flag() {
        let mut rear = dimension();
        rear.load_index2 = Some(10);
        assert!(!Dimensions::new(dimension(), rear).mixed_fitment);
    }

    #[test]
    fn test_dimensions_json_omits_absent_fields() {
        let dims = Dimensions::new(dimension(), dimension());
        let json = serde_json::to_value(&dims).unwrap();
        assert_eq!(json["mixedFitment"], false);
        assert_eq!(json["front"]["widthMM"], 175.0);
        assert!(json["front"].get("widthInch").is_none());
        assert!(json["front"].get("loadIndex2").is_none());
    }
}
