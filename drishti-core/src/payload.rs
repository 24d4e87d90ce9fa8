//! Result payloads published by detection modules

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Unknown,
    Male,
    Female,
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceAngle {
    pub roll: f32,
    pub yaw: f32,
    pub pitch: f32,
}

/// A recognized person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonInfo {
    pub id: u64,
    pub name: String,
    pub gender: Gender,
    pub age: Option<u8>,
    /// Role or title recorded for the person
    pub post: String,
    pub face: Rect,
    pub angle: Option<FaceAngle>,
    pub live: Option<bool>,
}

impl PersonInfo {
    pub fn new(id: u64, name: impl Into<String>, face: Rect) -> Self {
        Self {
            id,
            name: name.into(),
            gender: Gender::Unknown,
            age: None,
            post: String::new(),
            face,
            angle: None,
            live: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Surprised,
    Fearful,
    Disgusted,
}

/// Capture source transitions reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Opened,
    Closed,
    /// A tick found the source not open
    Lost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_area() {
        assert_eq!(Rect::new(-4, 2, 10, 20).area(), 200);
        assert_eq!(Rect::default().area(), 0);
    }

    #[test]
    fn test_person_info_defaults() {
        let person = PersonInfo::new(7, "Ada", Rect::new(0, 0, 32, 32));
        assert_eq!(person.gender, Gender::Unknown);
        assert!(person.age.is_none());
        assert!(person.post.is_empty());
    }

    #[test]
    fn test_person_info_json() {
        let mut person = PersonInfo::new(1, "Lin", Rect::new(1, 2, 3, 4));
        person.gender = Gender::Female;
        person.age = Some(31);
        let json = serde_json::to_string(&person).unwrap();
        assert!(json.contains("\"female\""));
        let back: PersonInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, person);
    }
}
