use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

pub const SERIES_TITLE: &str = "Series_Title";
pub const OVERVIEW: &str = "Overview";
pub const GROSS: &str = "Gross";
pub const CERTIFICATE: &str = "Certificate";
pub const META_SCORE: &str = "Meta_score";
pub const OVERVIEW_EMBEDDING: &str = "Overview_embedding";

/// A single typed cell of the dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One movie row, plus its embedding once computed.
///
/// Serializes as a flat JSON object: every column in file order, then
/// `Overview_embedding` when present. This is the stored document body.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    fields: Vec<(String, Value)>,
    overview_embedding: Option<Vec<f32>>,
}

impl MovieRecord {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self {
            fields,
            overview_embedding: None,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Title for diagnostics. Empty when the cell is missing.
    pub fn title(&self) -> String {
        self.display(SERIES_TITLE)
    }

    /// Text fed to the embedding model. Empty when the cell is missing.
    pub fn overview(&self) -> String {
        self.display(OVERVIEW)
    }

    fn display(&self, column: &str) -> String {
        match self.get(column) {
            Some(Value::Text(s)) => s.clone(),
            Some(Value::Int(i)) => i.to_string(),
            Some(Value::Float(f)) => f.to_string(),
            Some(Value::Missing) | None => String::new(),
        }
    }

    pub fn set_overview_embedding(&mut self, embedding: Vec<f32>) {
        self.overview_embedding = Some(embedding);
    }

    pub fn overview_embedding(&self) -> Option<&[f32]> {
        self.overview_embedding.as_deref()
    }
}

impl Serialize for MovieRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.overview_embedding.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        if let Some(embedding) = &self.overview_embedding {
            map.serialize_entry(OVERVIEW_EMBEDDING, embedding)?;
        }
        map.end()
    }
}

/// A row that was not written because its embedding failed
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based position in the dataset
    pub row: usize,
    pub title: String,
    pub reason: String,
}

/// Result of an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub total_rows: usize,
    pub documents_written: usize,
    pub document_ids: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> MovieRecord {
        MovieRecord::new(vec![
            (SERIES_TITLE.to_string(), Value::Text("Heat".to_string())),
            (OVERVIEW.to_string(), Value::Text("A heist.".to_string())),
            ("Released_Year".to_string(), Value::Int(1995)),
            (GROSS.to_string(), Value::Float(67_436_818.0)),
            ("Star4".to_string(), Value::Missing),
        ])
    }

    #[test]
    fn test_record_serializes_columns_in_order() {
        let doc = serde_json::to_string(&record()).unwrap();
        assert_eq!(
            doc,
            r#"{"Series_Title":"Heat","Overview":"A heist.","Released_Year":1995,"Gross":67436818.0,"Star4":null}"#
        );
    }

    #[test]
    fn test_record_serializes_embedding_last() {
        let mut rec = record();
        rec.set_overview_embedding(vec![0.5, -0.25]);
        let doc = serde_json::to_value(&rec).unwrap();
        assert_eq!(doc[OVERVIEW_EMBEDDING], json!([0.5, -0.25]));
        assert_eq!(doc.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_title_and_overview_accessors() {
        let rec = record();
        assert_eq!(rec.title(), "Heat");
        assert_eq!(rec.overview(), "A heist.");

        let untitled = MovieRecord::new(vec![(SERIES_TITLE.to_string(), Value::Missing)]);
        assert_eq!(untitled.title(), "");
        assert_eq!(untitled.overview(), "");
    }

    #[test]
    fn test_value_helpers() {
        assert!(Value::Missing.is_missing());
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("NA".into()).as_f64(), None);
    }
}
