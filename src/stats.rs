//! Read-only views derived from the entity collections.
//!
//! Everything here is a pure function over slices so the store can hand out
//! fresh numbers on every call without caching anything.

use crate::model::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, ClassEntity, ClassHistoryStats,
    HistoryRow, HistoryStats, StudentEntity,
};
use chrono::NaiveDate;
use std::collections::HashSet;

pub const UNKNOWN_CLASS: &str = "Unknown Class";
pub const UNKNOWN_STUDENT: &str = "Unknown Student";

/// Counters for the attendance tab.
///
/// Status counts are taken over every record dated `today`, whatever class
/// the student is in; `total` is the size of the filtered roster.
pub fn attendance_stats(
    records: &[AttendanceRecord],
    filtered_student_count: usize,
    today: NaiveDate,
) -> AttendanceStats {
    let mut stats = AttendanceStats {
        total: filtered_student_count,
        ..AttendanceStats::default()
    };
    let mut marked_today = 0usize;
    for r in records.iter().filter(|r| r.date == today) {
        marked_today += 1;
        match r.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Late => stats.late += 1,
        }
    }
    stats.unmarked = filtered_student_count as i64 - marked_today as i64;
    stats.attendance_rate = attendance_rate(stats.present, stats.total);
    stats
}

/// Percentage of present records, rounded to the nearest whole number.
pub fn attendance_rate(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as u32
}

pub fn history_stats<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> HistoryStats {
    let mut stats = HistoryStats::default();
    for r in records {
        stats.total += 1;
        match r.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Late => stats.late += 1,
        }
    }
    stats.attendance_rate = attendance_rate(stats.present, stats.total);
    stats
}

pub fn student_history_stats(records: &[AttendanceRecord], student_id: &str) -> HistoryStats {
    history_stats(records.iter().filter(|r| r.student_id == student_id))
}

/// Stats over the records of students currently enrolled in `class_id`.
pub fn class_history_stats(
    students: &[StudentEntity],
    records: &[AttendanceRecord],
    class_id: &str,
) -> ClassHistoryStats {
    let members: HashSet<&str> = students
        .iter()
        .filter(|s| s.class_id == class_id)
        .map(|s| s.id.as_str())
        .collect();
    ClassHistoryStats {
        stats: history_stats(
            records
                .iter()
                .filter(|r| members.contains(r.student_id.as_str())),
        ),
        student_count: members.len(),
    }
}

pub fn class_label(classes: &[ClassEntity], class_id: &str) -> String {
    classes
        .iter()
        .find(|c| c.id == class_id)
        .map(|c| format!("{} - {}", c.name, c.section))
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

pub fn student_name(students: &[StudentEntity], student_id: &str) -> String {
    students
        .iter()
        .find(|s| s.id == student_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| UNKNOWN_STUDENT.to_string())
}

/// History rows in stored order. Records whose student no longer exists are
/// left out.
pub fn history(
    classes: &[ClassEntity],
    students: &[StudentEntity],
    records: &[AttendanceRecord],
    class_filter: Option<&str>,
    student_filter: Option<&str>,
) -> Vec<HistoryRow> {
    records
        .iter()
        .filter_map(|r| {
            let student = students.iter().find(|s| s.id == r.student_id)?;
            if class_filter.is_some_and(|cid| student.class_id != cid) {
                return None;
            }
            if student_filter.is_some_and(|sid| r.student_id != sid) {
                return None;
            }
            Some(HistoryRow {
                record: r.clone(),
                student_label: format!("{} ({})", student.name, student.roll_number),
                class_label: class_label(classes, &student.class_id),
            })
        })
        .collect()
}
