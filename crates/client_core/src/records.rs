//! In-memory filtering and summaries over a loaded student listing.

use std::collections::BTreeSet;

use shared::domain::StudentRecord;

/// Search box plus class dropdown; both predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search_term: String,
    pub class_name: Option<String>,
}

impl RecordFilter {
    pub fn new(search_term: impl Into<String>, class_name: Option<String>) -> Self {
        Self {
            search_term: search_term.into(),
            class_name: class_name.filter(|class| !class.is_empty()),
        }
    }

    pub fn matches(&self, record: &StudentRecord) -> bool {
        self.matches_search(record) && self.matches_class(record)
    }

    pub fn apply(&self, records: &[StudentRecord]) -> Vec<StudentRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }

    fn matches_search(&self, record: &StudentRecord) -> bool {
        let term = self.search_term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        record.first_name.to_lowercase().contains(&term)
            || record.last_name.to_lowercase().contains(&term)
            || record.class_name.to_lowercase().contains(&term)
            || record.student_id.to_string().contains(&term)
    }

    fn matches_class(&self, record: &StudentRecord) -> bool {
        match &self.class_name {
            Some(class_name) => record.class_name == *class_name,
            None => true,
        }
    }
}

/// Sorted, de-duplicated class names for the class dropdown.
pub fn unique_classes(records: &[StudentRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.class_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordStats {
    pub total: usize,
    pub average_score: f64,
    pub class_count: usize,
}

impl RecordStats {
    pub fn from_records(records: &[StudentRecord]) -> Self {
        let total = records.len();
        let average_score = if total == 0 {
            0.0
        } else {
            records.iter().map(|record| record.score).sum::<f64>() / total as f64
        };
        Self {
            total,
            average_score,
            class_count: unique_classes(records).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use shared::domain::StudentId;

    use super::*;

    fn student(id: i64, first: &str, last: &str, class: &str, score: f64) -> StudentRecord {
        StudentRecord {
            student_id: StudentId(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            dob: NaiveDate::from_ymd_opt(2004, 2, 1).expect("date"),
            class_name: class.to_string(),
            score,
        }
    }

    fn sample() -> Vec<StudentRecord> {
        vec![
            student(1, "Ann", "Moore", "Class1", 80.0),
            student(2, "Bob", "Stone", "Class2", 60.0),
        ]
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filtered = RecordFilter::new("an", None).apply(&sample());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].first_name, "Ann");

        let filtered = RecordFilter::new("STONE", None).apply(&sample());
        assert_eq!(filtered[0].first_name, "Bob");
    }

    #[test]
    fn class_filter_is_anded_with_search() {
        let filtered = RecordFilter::new("an", Some("Class2".into())).apply(&sample());
        assert!(filtered.is_empty());

        let filtered = RecordFilter::new("", Some("Class2".into())).apply(&sample());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].first_name, "Bob");
    }

    #[test]
    fn empty_filter_keeps_everything_and_ids_are_searchable() {
        assert_eq!(RecordFilter::default().apply(&sample()).len(), 2);
        assert_eq!(RecordFilter::new("", Some(String::new())).apply(&sample()).len(), 2);
        let filtered = RecordFilter::new("2", None).apply(&sample());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].student_id, StudentId(2));
    }

    #[test]
    fn stats_and_classes_summarise_listing() {
        let mut records = sample();
        records.push(student(3, "Cid", "Vale", "Class1", 100.0));
        assert_eq!(unique_classes(&records), ["Class1", "Class2"]);

        let stats = RecordStats::from_records(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.class_count, 2);
        assert!((stats.average_score - 80.0).abs() < f64::EPSILON);

        assert_eq!(RecordStats::from_records(&[]).average_score, 0.0);
    }
}
