use crate::error::KilnError;
use crate::flatten::selector::PathSelector;
use crate::records::record::{CollisionPolicy, Record};
use crate::tree::json::TEXT_KEY;
use crate::tree::{Document, JsonOptions, NodeId};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

/// Reads allowed on one row before the cursor assumes a loop that forgot to
/// call `move_next`
pub const DEFAULT_MAX_READ_COUNT: usize = 2_000_000;

/// Ordered records with a movable cursor
///
/// The position is signed: `-1` (and `0`) is BOF, `record_count()` and past
/// is EOF. Out of range positions are states, not errors; accessors on them
/// return empty values.
#[derive(Debug, Clone)]
pub struct RecordSet {
    records: Vec<Record>,
    position: isize,
    read_count: usize,
    max_read_count: usize,
    policy: CollisionPolicy,
    /// Row receiving `add_column`, set by `add_row`
    write_row: Option<usize>,
}

impl Default for RecordSet {
    fn default() -> Self {
        RecordSet {
            records: Vec::new(),
            position: -1,
            read_count: 0,
            max_read_count: DEFAULT_MAX_READ_COUNT,
            policy: CollisionPolicy::default(),
            write_row: None,
        }
    }
}

impl RecordSet {
    pub fn new() -> Self {
        RecordSet::default()
    }

    /// Wrap existing records, positioned on the first one
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut set = RecordSet {
            records,
            ..Default::default()
        };
        set.move_first();
        set
    }

    /// Project the rows of a document
    ///
    /// Rows are the nodes matched by `selector`, or the root's children when
    /// there is none. Empty nodes are skipped. A row's own text becomes the
    /// `#text` field, then each child becomes one field holding its inner
    /// text.
    pub fn from_document(
        doc: &Document,
        selector: Option<&str>,
        policy: CollisionPolicy,
    ) -> Result<Self, KilnError> {
        let rows: Vec<NodeId> = match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(selector) => PathSelector::parse(selector)?.select(doc),
            None => doc.children(doc.root()).to_vec(),
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows.into_iter().filter(|&row| !doc.is_empty(row)) {
            let index = records.len();
            let mut record = Record::new();
            if let Some(text) = doc.text(row) {
                record.insert(TEXT_KEY, text, policy, index)?;
            }
            for &field in doc.children(row) {
                record.insert(doc.name(field), doc.inner_text(field), policy, index)?;
            }
            records.push(record);
        }

        let mut set = RecordSet::from_records(records);
        set.policy = policy;
        Ok(set)
    }

    /// Import JSON and project its rows, see `from_document`
    pub fn from_json(
        value: &Value,
        options: &JsonOptions,
        selector: Option<&str>,
        policy: CollisionPolicy,
    ) -> Result<Self, KilnError> {
        let doc = Document::from_json(value, options)?;
        RecordSet::from_document(&doc, selector, policy)
    }

    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.max_read_count = limit;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn move_first(&mut self) {
        self.position = 0;
        self.read_count = 0;
    }

    pub fn move_next(&mut self) {
        self.position += 1;
        self.read_count = 0;
    }

    pub fn move_previous(&mut self) {
        self.position -= 1;
        self.read_count = 0;
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn bof(&self) -> bool {
        self.position <= 0
    }

    pub fn eof(&self) -> bool {
        self.records.is_empty() || self.position >= self.records.len() as isize
    }

    /// The record under the cursor, if the cursor is on one
    pub fn current(&self) -> Option<&Record> {
        usize::try_from(self.position)
            .ok()
            .and_then(|pos| self.records.get(pos))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Field names of the current row
    pub fn keys(&self) -> Vec<&str> {
        self.current().map(|r| r.keys().collect()).unwrap_or_default()
    }

    pub fn column_exists(&self, name: &str) -> bool {
        self.current().is_some_and(|r| r.contains(name))
    }

    pub fn column_count(&self) -> usize {
        self.current().map_or(0, Record::len)
    }

    /// Header name from the first row, `""` when absent
    pub fn name(&self, index: usize) -> &str {
        self.records
            .first()
            .and_then(|r| r.name_at(index))
            .unwrap_or("")
    }

    /// Field name at `index` in the current row
    pub fn field_name(&self, index: usize) -> Result<&str, KilnError> {
        let count = self.column_count();
        self.current()
            .and_then(|r| r.name_at(index))
            .ok_or(KilnError::FieldNotFound { index, count })
    }

    pub fn item(&self, name: &str) -> &str {
        self.current().and_then(|r| r.get(name)).unwrap_or("")
    }

    pub fn item_int(&self, name: &str) -> i64 {
        parse_int(self.item(name))
    }

    pub fn item_f64(&self, name: &str) -> f64 {
        parse_f64(self.item(name))
    }

    pub fn item_bool(&self, name: &str) -> bool {
        parse_bool(self.item(name))
    }

    pub fn item_date(&self, name: &str) -> Option<NaiveDate> {
        parse_date(self.item(name))
    }

    /// Value at `index` in the current row; counts towards the read limit
    pub fn item_at(&mut self, index: usize) -> Result<String, KilnError> {
        self.count_read()?;
        Ok(self
            .current()
            .and_then(|r| r.value_at(index))
            .unwrap_or("")
            .to_string())
    }

    pub fn item_int_at(&mut self, index: usize) -> Result<i64, KilnError> {
        self.item_at(index).map(|v| parse_int(&v))
    }

    pub fn item_f64_at(&mut self, index: usize) -> Result<f64, KilnError> {
        self.item_at(index).map(|v| parse_f64(&v))
    }

    pub fn item_bool_at(&mut self, index: usize) -> Result<bool, KilnError> {
        self.item_at(index).map(|v| parse_bool(&v))
    }

    pub fn item_date_at(&mut self, index: usize) -> Result<Option<NaiveDate>, KilnError> {
        self.item_at(index).map(|v| parse_date(&v))
    }

    fn count_read(&mut self) -> Result<(), KilnError> {
        if self.read_count >= self.max_read_count {
            return Err(KilnError::RunawayRead {
                limit: self.max_read_count,
            });
        }
        self.read_count += 1;
        Ok(())
    }

    /// Append an empty row and make it the target of `add_column`
    pub fn add_row(&mut self) {
        self.records.push(Record::new());
        let index = self.records.len() - 1;
        self.write_row = Some(index);
        self.position = index as isize;
        self.read_count = 0;
    }

    pub fn add_column(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), KilnError> {
        let index = self.write_row.ok_or(KilnError::NoCurrentRow)?;
        let record = self.records.get_mut(index).ok_or(KilnError::NoCurrentRow)?;
        record.insert(name, value, self.policy, index)
    }

    /// `{"<root_name>": [rows...], "recordCount": n}`
    pub fn to_json(&self, root_name: &str) -> Value {
        let rows: Vec<Value> = self
            .records
            .iter()
            .map(|r| {
                Value::Object(
                    r.iter()
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect(),
                )
            })
            .collect();

        let mut out = Map::new();
        out.insert(root_name.to_string(), Value::Array(rows));
        out.insert("recordCount".to_string(), json!(self.records.len()));
        Value::Object(out)
    }
}

fn parse_int(value: &str) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        .unwrap_or(0)
}

fn parse_f64(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "yes" | "y" | "on" => true,
        "false" | "no" | "n" | "off" | "" => false,
        other => other.parse::<i64>().map(|n| n != 0).unwrap_or(false),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value[0..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        let value = json!({"people": {"person": [
            {"name": "Ada", "age": "36", "admin": "yes", "joined": "1843-07-10", "score": "9.5"},
            {"name": "Alan", "age": "41", "admin": "0", "joined": "19120623", "score": "x"}
        ]}});
        RecordSet::from_json(&value, &JsonOptions::default(), None, CollisionPolicy::Reject).unwrap()
    }

    #[test]
    fn test_empty_set_is_bof_and_eof() {
        let mut set = RecordSet::new();
        assert_eq!(set.position(), -1);
        assert!(set.bof());
        assert!(set.eof());
        assert_eq!(set.item("anything"), "");
        assert_eq!(set.item_int("anything"), 0);
        assert_eq!(set.item_at(3).unwrap(), "");
        assert!(set.keys().is_empty());

        set.move_first();
        assert!(set.bof());
        assert!(set.eof());
    }

    #[test]
    fn test_navigation_bounds() {
        let mut set = sample();
        assert_eq!(set.position(), 0);
        assert!(set.bof());
        assert!(!set.eof());
        assert_eq!(set.item("name"), "Ada");

        set.move_next();
        assert!(!set.bof());
        assert!(!set.eof());
        assert_eq!(set.item("name"), "Alan");

        set.move_next();
        assert!(set.eof());
        assert!(set.current().is_none());
        assert_eq!(set.item("name"), "");

        set.move_first();
        set.move_previous();
        assert_eq!(set.position(), -1);
        assert!(set.bof());
        assert_eq!(set.item("name"), "");
    }

    #[test]
    fn test_iteration_visits_rows_in_order() {
        let mut set = sample();
        let mut names = Vec::new();
        set.move_first();
        while !set.eof() {
            names.push(set.item("name").to_string());
            set.move_next();
        }
        assert_eq!(names, vec!["Ada", "Alan"]);
    }

    #[test]
    fn test_typed_accessors() {
        let mut set = sample();
        assert_eq!(set.item_int("age"), 36);
        assert!(set.item_bool("admin"));
        assert_eq!(set.item_f64("score"), 9.5);
        assert_eq!(set.item_date("joined"), NaiveDate::from_ymd_opt(1843, 7, 10));
        assert_eq!(set.item_int("name"), 0);
        assert_eq!(set.item_date("name"), None);

        set.move_next();
        assert!(!set.item_bool("admin"));
        assert_eq!(set.item_f64("score"), 0.0);
        assert_eq!(set.item_date("joined"), NaiveDate::from_ymd_opt(1912, 6, 23));
        assert_eq!(set.item_int_at(1).unwrap(), 41);
        assert!(!set.item_bool_at(2).unwrap());
        assert_eq!(set.item_date_at(3).unwrap(), NaiveDate::from_ymd_opt(1912, 6, 23));
    }

    #[test]
    fn test_parsers() {
        for truthy in ["TRUE", "Yes", "y", "on", "1", "-3"] {
            assert!(parse_bool(truthy), "{}", truthy);
        }
        for falsy in ["false", "NO", "n", "off", "0", "", "maybe"] {
            assert!(!parse_bool(falsy), "{}", falsy);
        }

        assert_eq!(parse_int(" 42 "), 42);
        assert_eq!(parse_int("12.9"), 12);
        assert_eq!(parse_int("abc"), 0);
        // Values past the 32-bit range keep their full width
        assert_eq!(parse_int("9007199254740993"), 9_007_199_254_740_993);
        assert_eq!(parse_int("-4294967296"), -4_294_967_296);

        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date("2024-03-15"), expected);
        assert_eq!(parse_date("20240315"), expected);
        assert_eq!(parse_date("2024-03-15T10:00:00Z"), expected);
        assert_eq!(parse_date("2024-03-15T10:00:00+02:00"), expected);
        assert_eq!(parse_date("2024-03-15T10:00:00"), expected);
        assert_eq!(parse_date("20241315"), None);
        assert_eq!(parse_date("15/03/2024"), None);
    }

    #[test]
    fn test_names_and_fields() {
        let mut set = sample();
        assert_eq!(set.name(0), "name");
        assert_eq!(set.name(99), "");
        assert_eq!(set.field_name(1).unwrap(), "age");
        assert!(matches!(
            set.field_name(5),
            Err(KilnError::FieldNotFound { index: 5, count: 5 })
        ));
        assert!(set.column_exists("joined"));
        assert!(!set.column_exists("email"));
        assert_eq!(set.column_count(), 5);
        assert_eq!(set.keys(), vec!["name", "age", "admin", "joined", "score"]);

        set.move_next();
        set.move_next();
        assert!(matches!(
            set.field_name(0),
            Err(KilnError::FieldNotFound { index: 0, count: 0 })
        ));
        // The header still comes from the first row
        assert_eq!(set.name(0), "name");
    }

    #[test]
    fn test_runaway_read_guard_resets_on_move() {
        let mut set = sample().with_read_limit(3);

        for _ in 0..3 {
            set.item_at(0).unwrap();
        }
        assert!(matches!(set.item_at(0), Err(KilnError::RunawayRead { limit: 3 })));
        assert!(matches!(set.item_int_at(1), Err(KilnError::RunawayRead { .. })));

        // Named access is not counted
        assert_eq!(set.item("name"), "Ada");

        set.move_next();
        assert_eq!(set.item_at(0).unwrap(), "Alan");

        set.move_previous();
        for _ in 0..3 {
            set.item_at(0).unwrap();
        }
        set.move_first();
        assert_eq!(set.item_at(0).unwrap(), "Ada");
    }

    #[test]
    fn test_manual_population() {
        let mut set = RecordSet::new();
        assert!(matches!(set.add_column("a", "1"), Err(KilnError::NoCurrentRow)));

        set.add_row();
        set.add_column("id", "1").unwrap();
        set.add_column("name", "first").unwrap();
        set.add_row();
        set.add_column("id", "2").unwrap();

        assert_eq!(set.record_count(), 2);
        assert_eq!(set.item("id"), "2");

        set.move_first();
        assert_eq!(set.item("name"), "first");

        // Overwrite is the default policy
        set.add_column("id", "3").unwrap();
        assert_eq!(set.records()[1].get("id"), Some("3"));

        let mut strict = RecordSet::new().with_collision_policy(CollisionPolicy::Reject);
        strict.add_row();
        strict.add_column("id", "1").unwrap();
        assert!(matches!(
            strict.add_column("id", "2"),
            Err(KilnError::FieldNameCollision { row: 0, .. })
        ));
    }

    #[test]
    fn test_from_document_with_selector() {
        let value = json!({"root": {
            "header": {"title": "report"},
            "rows": {"row": [{"v": "1"}, {"v": "2"}], "note": "n"}
        }});
        let options = JsonOptions::default();

        let set = RecordSet::from_json(&value, &options, Some("rows/row"), CollisionPolicy::Reject).unwrap();
        assert_eq!(set.record_count(), 2);
        assert_eq!(set.item("v"), "1");

        // Default rows are the root's children, so the repeated `row` leaves collide
        let set = RecordSet::from_json(&value, &options, None, CollisionPolicy::Overwrite).unwrap();
        assert_eq!(set.record_count(), 2);
        assert_eq!(set.records()[0].get("title"), Some("report"));
        assert_eq!(set.records()[1].keys().collect::<Vec<_>>(), vec!["row", "note"]);
        assert_eq!(set.records()[1].get("row"), Some("2"));
    }

    #[test]
    fn test_row_text_becomes_a_field() {
        let value = json!({"root": {"tag": ["a", "b", null], "note": {"#text": "n", "@lang": "en", "by": "ops"}}});
        let options = JsonOptions::default();

        let set = RecordSet::from_json(&value, &options, Some("tag"), CollisionPolicy::Reject).unwrap();
        assert_eq!(set.record_count(), 2);
        assert_eq!(set.keys(), vec!["#text"]);
        assert_eq!(set.records()[1].get("#text"), Some("b"));

        let set = RecordSet::from_json(&value, &options, Some("note"), CollisionPolicy::Reject).unwrap();
        assert_eq!(set.records()[0].keys().collect::<Vec<_>>(), vec!["#text", "by"]);
    }

    #[test]
    fn test_duplicate_fields_follow_policy() {
        let value = json!({"root": {"row": {"v": ["1", "2"]}}});
        let options = JsonOptions::default();

        let set = RecordSet::from_json(&value, &options, None, CollisionPolicy::Overwrite).unwrap();
        assert_eq!(set.item("v"), "2");

        assert!(matches!(
            RecordSet::from_json(&value, &options, None, CollisionPolicy::Reject),
            Err(KilnError::FieldNameCollision { row: 0, .. })
        ));
    }

    #[test]
    fn test_to_json() {
        let set = sample();
        let value = set.to_json("people");
        assert_eq!(value["recordCount"], json!(2));
        assert_eq!(value["people"][1]["name"], json!("Alan"));
        assert_eq!(value["people"].as_array().map(Vec::len), Some(2));
    }
}
