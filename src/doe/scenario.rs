use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use super::params::{join_param_name, split_param_name};
use crate::config::{ENTITY_KEY_FIELD, ENTITY_NAME_FIELD};

/// Sampled properties of one entity (a material, a pier...), serialized as
/// `{"Name": "<entity>", "<property>": <f64>, ...}` in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub name: String,
    properties: Vec<(String, f64)>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), properties: Vec::new() }
    }

    /// Insert or overwrite a property, keeping its first position.
    pub fn set(&mut self, property: &str, value: f64) {
        match self.properties.iter_mut().find(|(p, _)| p == property) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((property.to_string(), value)),
        }
    }

    pub fn get(&self, property: &str) -> Option<f64> {
        self.properties.iter().find(|(p, _)| p == property).map(|(_, v)| *v)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, f64)> {
        self.properties.iter().map(|(p, v)| (p.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// How numeric analysis outputs are named when they join the feature columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputColumns {
    /// Outputs stay out of the feature table.
    Skip,
    /// The output key alone (`Uz`). The first analysis reporting a key wins.
    #[default]
    Bare,
    /// `<Analysis>_<Key>` (`Vert_Uz`).
    Qualified,
}

/// One sampled point: entity records plus the analysis tag(s) attached verbatim.
///
/// Simulation results written back under `Output` (one object per analysis)
/// and any other top-level field such as `Geometry` are kept as raw JSON, so
/// a batch survives load and save unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(rename = "Materials", default)]
    pub entities: Vec<EntityRecord>,
    #[serde(rename = "Analysis", default)]
    pub analysis: Vec<String>,
    #[serde(rename = "Output", default, skip_serializing_if = "Map::is_empty")]
    pub outputs: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A JSON number, or a string holding one.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Scenario {
    /// A scenario with no entity data, only the analysis tag.
    pub fn analysis_only(analysis: &str) -> Self {
        Self { analysis: vec![analysis.to_string()], ..Self::default() }
    }

    /// Group flattened `<Entity>_<Property>` values into entity records.
    /// Entities appear in first-seen order. A name without a property part
    /// creates the entity but records no value.
    pub fn from_flat<'a, I>(values: I, analysis: &str) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut scenario = Self::analysis_only(analysis);
        for (name, value) in values {
            let (entity, property) = split_param_name(name);
            let record = scenario.entity_mut_or_insert(entity);
            if let Some(property) = property {
                record.set(property, value);
            }
        }
        scenario
    }

    fn entity_mut_or_insert(&mut self, entity: &str) -> &mut EntityRecord {
        let pos = match self.entities.iter().position(|r| r.name == entity) {
            Some(pos) => pos,
            None => {
                self.entities.push(EntityRecord::new(entity));
                self.entities.len() - 1
            }
        };
        &mut self.entities[pos]
    }

    pub fn entity(&self, name: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|r| r.name == name)
    }

    /// Value of a flattened `<Entity>_<Property>` name.
    pub fn value(&self, flat_name: &str) -> Option<f64> {
        let (entity, property) = split_param_name(flat_name);
        self.entity(entity)?.get(property?)
    }

    pub fn analysis_tag(&self) -> Option<&str> {
        self.analysis.first().map(String::as_str)
    }

    /// Numeric output `key` of `analysis`, e.g. `output("Vert", "Uz")`.
    pub fn output(&self, analysis: &str, key: &str) -> Option<f64> {
        numeric(self.outputs.get(analysis)?.get(key)?)
    }

    /// Record a scalar result. A non-object entry for `analysis` is replaced.
    pub fn set_output(&mut self, analysis: &str, key: &str, value: f64) {
        let entry = self
            .outputs
            .entry(analysis.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert(key.to_string(), Value::from(value));
        }
    }

    /// Scalar outputs as named feature values, sorted by analysis then key.
    /// Lists, nested objects and non-numeric strings are skipped.
    pub fn output_values(&self, naming: OutputColumns) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = Vec::new();
        if naming == OutputColumns::Skip {
            return out;
        }
        for (analysis, fields) in &self.outputs {
            let Some(fields) = fields.as_object() else { continue };
            for (key, value) in fields {
                let Some(v) = numeric(value) else { continue };
                let name = match naming {
                    OutputColumns::Qualified => join_param_name(analysis, key),
                    _ => key.clone(),
                };
                if !out.iter().any(|(n, _)| *n == name) {
                    out.push((name, v));
                }
            }
        }
        out
    }

    /// Flatten to `(<Entity>_<Property>, value)` pairs in record order.
    /// Entity names are trimmed and interior spaces become `_`.
    pub fn flatten(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        for record in &self.entities {
            let entity = record.name.trim().replace(' ', "_");
            for (property, value) in record.properties() {
                out.push((join_param_name(&entity, property), value));
            }
        }
        out
    }
}

impl Serialize for EntityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + 1))?;
        map.serialize_entry(ENTITY_NAME_FIELD, &self.name)?;
        for (property, value) in &self.properties {
            map.serialize_entry(property, value)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl FieldValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Other(_) => None,
        }
    }
}

struct EntityRecordVisitor;

impl<'de> Visitor<'de> for EntityRecordVisitor {
    type Value = EntityRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an entity record with a Name field")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut name: Option<String> = None;
        let mut key: Option<f64> = None;
        let mut properties = Vec::new();
        while let Some(field) = map.next_key::<String>()? {
            if field == ENTITY_NAME_FIELD {
                name = Some(map.next_value()?);
                continue;
            }
            // Numeric strings count as values; anything else is skipped.
            let Some(v) = map.next_value::<FieldValue>()?.as_number() else { continue };
            if field == ENTITY_KEY_FIELD {
                key = Some(v);
            } else {
                properties.push((field, v));
            }
        }
        let name = match (name, key) {
            (Some(name), _) => name,
            (None, Some(key)) => format!("Key{}", key),
            (None, None) => return Err(de::Error::missing_field(ENTITY_NAME_FIELD)),
        };
        Ok(EntityRecord { name, properties })
    }
}

impl<'de> Deserialize<'de> for EntityRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntityRecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_groups_by_entity_in_first_seen_order() {
        let s = Scenario::from_flat(
            [("Mat_E", 1500.0), ("Pier_h", 3.0), ("Mat_w", 12.0)],
            "Push",
        );
        assert_eq!(s.entities.len(), 2);
        assert_eq!(s.entities[0].name, "Mat");
        assert_eq!(s.entities[0].get("E"), Some(1500.0));
        assert_eq!(s.entities[0].get("w"), Some(12.0));
        assert_eq!(s.entities[1].name, "Pier");
        assert_eq!(s.analysis_tag(), Some("Push"));
        assert_eq!(s.value("Pier_h"), Some(3.0));
        assert_eq!(s.value("Pier"), None);
    }

    #[test]
    fn property_less_name_creates_empty_entity() {
        let s = Scenario::from_flat([("Soil", 0.4)], "Push");
        assert_eq!(s.entities.len(), 1);
        assert!(s.entities[0].is_empty());
        assert!(s.flatten().is_empty());
    }

    #[test]
    fn flatten_round_trips_from_flat() {
        let flat = [("Mat_E", 2000.0), ("Mat_w", 15.0), ("Piers_top_w", 0.3)];
        let s = Scenario::from_flat(flat, "Push");
        let names: Vec<(String, f64)> = s.flatten();
        let expected: Vec<(String, f64)> = flat.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn json_shape_matches_record_layout() {
        let s = Scenario::from_flat([("Mat_E", 2000.0), ("Mat_w", 15.0)], "Push");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(
            json,
            r#"{"Materials":[{"Name":"Mat","E":2000.0,"w":15.0}],"Analysis":["Push"]}"#
        );
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn loading_skips_non_numeric_fields_and_key() {
        let json = r#"{"Materials":[{"Key":3,"Name":"Arch","E":900.5,"Type":"masonry"}],"Analysis":["Vert"]}"#;
        let s: Scenario = serde_json::from_str(json).unwrap();
        let arch = s.entity("Arch").unwrap();
        assert_eq!(arch.len(), 1);
        assert_eq!(arch.get("E"), Some(900.5));
    }

    #[test]
    fn missing_name_falls_back_to_key() {
        let json = r#"{"Materials":[{"Key":7,"E":1.0}]}"#;
        let s: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(s.entities[0].name, "Key7");
        assert!(s.analysis.is_empty());

        let bad = r#"{"Materials":[{"E":1.0}]}"#;
        assert!(serde_json::from_str::<Scenario>(bad).is_err());
    }

    #[test]
    fn numeric_strings_are_read_as_values() {
        let json = r#"{"Materials":[{"Key":"4","E":"2500","nu":" 0.2 ","Type":"masonry"}]}"#;
        let s: Scenario = serde_json::from_str(json).unwrap();
        let record = &s.entities[0];
        assert_eq!(record.name, "Key4");
        assert_eq!(record.get("E"), Some(2500.0));
        assert_eq!(record.get("nu"), Some(0.2));
        assert_eq!(record.get("Type"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn outputs_and_unknown_fields_survive_a_round_trip() {
        let json = r#"{"Materials":[{"Name":"Mat","E":2000.0}],"Analysis":["Vert"],"Output":{"Vert":{"Uz":-0.012,"Exit":"converged","Displacements":[0.1,0.2]}},"Geometry":{"span":12.5}}"#;
        let s: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(s.output("Vert", "Uz"), Some(-0.012));
        assert_eq!(s.output("Vert", "Exit"), None);
        assert_eq!(s.extra["Geometry"]["span"], 12.5);

        let back: Scenario = serde_json::from_str(&serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(back, s);
        let value: Value = serde_json::to_value(&s).unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(json).unwrap());
    }

    #[test]
    fn output_values_follow_the_naming_choice() {
        let mut s = Scenario::from_flat([("Mat_E", 1.0)], "Vert");
        s.set_output("Vert", "Uz", -0.5);
        s.set_output("Push", "Fmax", 120.0);
        s.set_output("Push", "Uz", -0.7);
        s.outputs["Push"]["Exit"] = Value::from("ok");

        assert!(s.output_values(OutputColumns::Skip).is_empty());
        assert_eq!(
            s.output_values(OutputColumns::Bare),
            vec![("Fmax".to_string(), 120.0), ("Uz".to_string(), -0.7)]
        );
        assert_eq!(
            s.output_values(OutputColumns::Qualified),
            vec![
                ("Push_Fmax".to_string(), 120.0),
                ("Push_Uz".to_string(), -0.7),
                ("Vert_Uz".to_string(), -0.5),
            ]
        );
    }
}
