//! JSON has no literal for NaN or infinity; non-finite values are written as
//! the strings "NaN", "Infinity" and "-Infinity".

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum FloatRepr {
    Number(f32),
    Text(String),
}

impl From<f32> for FloatRepr {
    fn from(value: f32) -> Self {
        if value.is_nan() {
            FloatRepr::Text("NaN".to_string())
        } else if value.is_infinite() {
            let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
            FloatRepr::Text(text.to_string())
        } else {
            FloatRepr::Number(value)
        }
    }
}

impl FloatRepr {
    fn into_f32(self) -> Result<f32, String> {
        match self {
            FloatRepr::Number(value) => Ok(value),
            FloatRepr::Text(text) => match text.as_str() {
                "NaN" => Ok(f32::NAN),
                "Infinity" => Ok(f32::INFINITY),
                "-Infinity" => Ok(f32::NEG_INFINITY),
                other => Err(format!("invalid float literal {:?}", other)),
            },
        }
    }
}

pub mod single {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        FloatRepr::from(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        FloatRepr::deserialize(deserializer)?
            .into_f32()
            .map_err(D::Error::custom)
    }
}

pub mod vec {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| FloatRepr::from(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        Vec::<FloatRepr>::deserialize(deserializer)?
            .into_iter()
            .map(|repr| repr.into_f32().map_err(D::Error::custom))
            .collect()
    }
}
