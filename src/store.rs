use crate::clock::Clock;
use crate::model::{
    AttendanceRecord, AttendanceSession, AttendanceStats, AttendanceStatus, ClassEntity,
    ClassHistoryStats, HistoryRow, HistoryStats, StudentEntity, StudentFields,
};
use crate::stats;
use crate::storage::KeyValueStore;
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const KEY_CLASSES: &str = "classes";
pub const KEY_STUDENTS: &str = "students";
pub const KEY_RECORDS: &str = "attendanceRecords";
pub const KEY_CURRENT_SESSION: &str = "currentSession";

/// Outcome of a delete, including how many dependents went with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeSummary {
    pub removed: bool,
    pub dependents_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub session: AttendanceSession,
    /// The session that was active before and has now been dropped.
    pub replaced: Option<AttendanceSession>,
}

/// Owner of every class, student, record and the active session.
///
/// Each mutation writes the collections it touched back to `kv` before it
/// returns. Storage failures are logged and otherwise ignored; the in-memory
/// state stays authoritative for the life of the process.
pub struct AttendanceStore<K> {
    kv: K,
    clock: Box<dyn Clock>,
    busy_delay: TimeDelta,
    classes: Vec<ClassEntity>,
    students: Vec<StudentEntity>,
    records: Vec<AttendanceRecord>,
    current_session: Option<AttendanceSession>,
    selected_class: Option<String>,
    busy_until: Option<DateTime<Utc>>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn read_json<K: KeyValueStore, T: DeserializeOwned>(kv: &K, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "storage read failed; starting empty");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "stored value is malformed; starting empty");
            None
        }
    }
}

fn write_json<K: KeyValueStore, T: Serialize + ?Sized>(kv: &mut K, key: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            warn!(key, error = %e, "failed to encode value; not persisted");
            return;
        }
    };
    if let Err(e) = kv.set(key, &encoded) {
        warn!(key, error = %e, "storage write failed");
    }
}

impl<K: KeyValueStore> AttendanceStore<K> {
    /// Loads all four collections from `kv`. Missing or unreadable entries
    /// become empty collections (or no session).
    pub fn load(kv: K, clock: Box<dyn Clock>, busy_delay: Duration) -> Self {
        let classes: Vec<ClassEntity> = read_json(&kv, KEY_CLASSES).unwrap_or_default();
        let students: Vec<StudentEntity> = read_json(&kv, KEY_STUDENTS).unwrap_or_default();
        let records: Vec<AttendanceRecord> = read_json(&kv, KEY_RECORDS).unwrap_or_default();
        let current_session: Option<AttendanceSession> = read_json(&kv, KEY_CURRENT_SESSION);

        info!(
            classes = classes.len(),
            students = students.len(),
            records = records.len(),
            session_active = current_session.is_some(),
            "attendance store loaded"
        );

        AttendanceStore {
            kv,
            clock,
            busy_delay: TimeDelta::from_std(busy_delay).unwrap_or(TimeDelta::zero()),
            classes,
            students,
            records,
            current_session,
            selected_class: None,
            busy_until: None,
        }
    }

    fn save_classes(&mut self) {
        write_json(&mut self.kv, KEY_CLASSES, &self.classes);
    }

    fn save_students(&mut self) {
        write_json(&mut self.kv, KEY_STUDENTS, &self.students);
    }

    fn save_records(&mut self) {
        write_json(&mut self.kv, KEY_RECORDS, &self.records);
    }

    fn save_session(&mut self) {
        match &self.current_session {
            Some(session) => write_json(&mut self.kv, KEY_CURRENT_SESSION, session),
            None => {
                if let Err(e) = self.kv.remove(KEY_CURRENT_SESSION) {
                    warn!(key = KEY_CURRENT_SESSION, error = %e, "storage remove failed");
                }
            }
        }
    }

    pub fn classes(&self) -> &[ClassEntity] {
        &self.classes
    }

    /// Every student regardless of the class filter.
    pub fn students(&self) -> &[StudentEntity] {
        &self.students
    }

    #[cfg(test)]
    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn current_session(&self) -> Option<&AttendanceSession> {
        self.current_session.as_ref()
    }

    // ---- classes ----

    pub fn add_class(&mut self, name: &str, section: &str) -> ClassEntity {
        let class = ClassEntity {
            id: new_id(),
            name: name.to_string(),
            section: section.to_string(),
        };
        self.classes.push(class.clone());
        self.save_classes();
        debug!(class_id = %class.id, "class added");
        class
    }

    /// Returns false, changing nothing, when no class has `id`.
    pub fn update_class(&mut self, id: &str, name: &str, section: &str) -> bool {
        let Some(class) = self.classes.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        class.name = name.to_string();
        class.section = section.to_string();
        self.save_classes();
        true
    }

    /// Removes the class and every student enrolled in it. Attendance records
    /// of those students are kept.
    pub fn delete_class(&mut self, id: &str) -> CascadeSummary {
        let before = self.classes.len();
        self.classes.retain(|c| c.id != id);
        let removed = self.classes.len() != before;
        let dependents_removed = self.cascade_class_students(id);
        self.save_classes();
        self.save_students();
        info!(class_id = id, removed, students_removed = dependents_removed, "class deleted");
        CascadeSummary {
            removed,
            dependents_removed,
        }
    }

    /// Drops every student whose `class_id` is `class_id`; returns the count.
    pub fn cascade_class_students(&mut self, class_id: &str) -> usize {
        let before = self.students.len();
        self.students.retain(|s| s.class_id != class_id);
        before - self.students.len()
    }

    // ---- students ----

    /// The class id is not checked against existing classes.
    pub fn add_student(&mut self, fields: StudentFields) -> StudentEntity {
        let student = fields.into_entity(new_id());
        self.students.push(student.clone());
        self.save_students();
        debug!(student_id = %student.id, class_id = %student.class_id, "student added");
        student
    }

    pub fn update_student(&mut self, id: &str, fields: StudentFields) -> bool {
        let Some(slot) = self.students.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        *slot = fields.into_entity(id.to_string());
        self.save_students();
        true
    }

    /// Removes the student and all of their attendance records.
    pub fn delete_student(&mut self, id: &str) -> CascadeSummary {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        let removed = self.students.len() != before;
        let dependents_removed = self.cascade_student_records(id);
        self.save_students();
        self.save_records();
        info!(student_id = id, removed, records_removed = dependents_removed, "student deleted");
        CascadeSummary {
            removed,
            dependents_removed,
        }
    }

    /// Drops every attendance record for `student_id`; returns the count.
    pub fn cascade_student_records(&mut self, student_id: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.student_id != student_id);
        before - self.records.len()
    }

    // ---- filter ----

    pub fn select_class(&mut self, class_id: Option<String>) {
        self.selected_class = class_id;
    }

    pub fn selected_class(&self) -> Option<&str> {
        self.selected_class.as_deref()
    }

    /// All students when no class is selected, otherwise that class's roster.
    pub fn filtered_students(&self) -> Vec<&StudentEntity> {
        match self.selected_class.as_deref() {
            None => self.students.iter().collect(),
            Some(cid) => self.students.iter().filter(|s| s.class_id == cid).collect(),
        }
    }

    // ---- session ----

    /// Opens a session dated today. An already active session is replaced
    /// without being kept anywhere.
    pub fn start_session(&mut self, subject: &str) -> SessionStart {
        let now = self.clock.now();
        let session = AttendanceSession {
            id: new_id(),
            date: self.clock.today(),
            subject: subject.to_string(),
            start_time: now,
            end_time: None,
            is_active: true,
        };
        let replaced = self.current_session.replace(session.clone());
        if let Some(old) = &replaced {
            warn!(
                replaced_session = %old.id,
                replaced_subject = %old.subject,
                "session started while another was active; previous session dropped"
            );
        }
        self.save_session();
        info!(session_id = %session.id, subject, "session started");
        SessionStart { session, replaced }
    }

    /// Closes the active session. The returned copy carries the end time but
    /// is not stored; only records written during the session remain.
    pub fn end_session(&mut self) -> Option<AttendanceSession> {
        let mut ended = self.current_session.take()?;
        ended.end_time = Some(self.clock.now());
        ended.is_active = false;
        self.save_session();
        info!(session_id = %ended.id, "session ended");
        Some(ended)
    }

    // ---- attendance ----

    /// Writes today's status for the student, replacing any earlier record
    /// from today. Does nothing and returns `None` without an active session.
    pub fn mark_attendance(
        &mut self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Option<AttendanceRecord> {
        if self.current_session.is_none() {
            debug!(student_id, "no active session; attendance not recorded");
            return None;
        }
        let now = self.clock.now();
        // A delay past chrono's date range leaves the indicator off.
        self.busy_until = now.checked_add_signed(self.busy_delay);

        let today = self.clock.today();
        self.records
            .retain(|r| !(r.student_id == student_id && r.date == today));
        let record = AttendanceRecord {
            id: new_id(),
            student_id: student_id.to_string(),
            date: today,
            status,
            timestamp: now,
        };
        self.records.push(record.clone());
        self.save_records();
        debug!(student_id, %status, "attendance marked");
        Some(record)
    }

    /// True for a short while after attendance is marked. Purely cosmetic.
    pub fn is_busy(&self) -> bool {
        self.busy_until
            .is_some_and(|until| self.clock.now() < until)
    }

    pub fn today_records(&self) -> Vec<&AttendanceRecord> {
        let today = self.clock.today();
        self.records.iter().filter(|r| r.date == today).collect()
    }

    pub fn student_status(&self, student_id: &str) -> Option<AttendanceStatus> {
        let today = self.clock.today();
        self.records
            .iter()
            .find(|r| r.student_id == student_id && r.date == today)
            .map(|r| r.status)
    }

    // ---- derived views ----

    pub fn attendance_stats(&self) -> AttendanceStats {
        stats::attendance_stats(
            &self.records,
            self.filtered_students().len(),
            self.clock.today(),
        )
    }

    pub fn student_history_stats(&self, student_id: &str) -> HistoryStats {
        stats::student_history_stats(&self.records, student_id)
    }

    pub fn class_history_stats(&self, class_id: &str) -> ClassHistoryStats {
        stats::class_history_stats(&self.students, &self.records, class_id)
    }

    pub fn overall_stats(&self) -> HistoryStats {
        stats::history_stats(&self.records)
    }

    pub fn history(&self, class_filter: Option<&str>, student_filter: Option<&str>) -> Vec<HistoryRow> {
        stats::history(
            &self.classes,
            &self.students,
            &self.records,
            class_filter,
            student_filter,
        )
    }

    pub fn class_label(&self, class_id: &str) -> String {
        stats::class_label(&self.classes, class_id)
    }

    pub fn student_name(&self, student_id: &str) -> String {
        stats::student_name(&self.students, student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryKv;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn store_at(kv: &MemoryKv, clock: &FixedClock) -> AttendanceStore<MemoryKv> {
        AttendanceStore::load(
            kv.clone(),
            Box::new(clock.clone()),
            Duration::from_millis(300),
        )
    }

    fn fields(name: &str, roll: &str, class_id: &str) -> StudentFields {
        StudentFields {
            name: name.to_string(),
            email: None,
            roll_number: roll.to_string(),
            class_id: class_id.to_string(),
        }
    }

    #[test]
    fn add_classes_keeps_insertion_order_with_unique_ids() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        for i in 0..25 {
            store.add_class(&format!("Grade {i}"), "A");
        }
        let names: Vec<_> = store.classes().iter().map(|c| c.name.clone()).collect();
        let expected: Vec<_> = (0..25).map(|i| format!("Grade {i}")).collect();
        assert_eq!(names, expected);
        let ids: HashSet<_> = store.classes().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn update_class_replaces_in_place_and_ignores_unknown_ids() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let a = store.add_class("Grade 10", "A");
        let b = store.add_class("Grade 11", "B");

        assert!(store.update_class(&a.id, "Grade 10", "C"));
        assert!(!store.update_class("missing", "X", "Y"));
        assert_eq!(store.classes()[0].section, "C");
        assert_eq!(store.classes()[0].id, a.id);
        assert_eq!(store.classes()[1], b);
    }

    #[test]
    fn delete_class_cascades_to_its_students_only() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let c1 = store.add_class("Grade 10", "A");
        let c2 = store.add_class("Grade 11", "A");
        let s1 = store.add_student(fields("Alice", "01", &c1.id));
        store.add_student(fields("Ann", "02", &c1.id));
        let s3 = store.add_student(fields("Bob", "01", &c2.id));

        store.start_session("Math");
        store.mark_attendance(&s1.id, AttendanceStatus::Present);

        let summary = store.delete_class(&c1.id);
        assert_eq!(
            summary,
            CascadeSummary {
                removed: true,
                dependents_removed: 2
            }
        );
        assert_eq!(store.classes(), &[c2]);
        assert_eq!(store.students(), &[s3]);
        // Records of the removed students are left behind.
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].student_id, s1.id);
    }

    #[test]
    fn delete_student_cascades_to_records() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let c = store.add_class("Grade 10", "A");
        let s1 = store.add_student(fields("Alice", "01", &c.id));
        let s2 = store.add_student(fields("Bob", "02", &c.id));

        store.start_session("Math");
        store.mark_attendance(&s1.id, AttendanceStatus::Present);
        store.mark_attendance(&s2.id, AttendanceStatus::Late);
        clock.advance(TimeDelta::days(1));
        store.mark_attendance(&s1.id, AttendanceStatus::Absent);

        let summary = store.delete_student(&s1.id);
        assert!(summary.removed);
        assert_eq!(summary.dependents_removed, 2);
        assert_eq!(store.students(), &[s2.clone()]);
        assert!(store.records().iter().all(|r| r.student_id == s2.id));

        let missing = store.delete_student("nobody");
        assert_eq!(missing, CascadeSummary::default());
    }

    #[test]
    fn update_student_keeps_id_and_position() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let s1 = store.add_student(fields("Alice", "01", "c1"));
        let s2 = store.add_student(fields("Bob", "02", "c1"));

        let mut changed = fields("Alicia", "07", "c2");
        changed.email = Some("alicia@example.com".into());
        assert!(store.update_student(&s1.id, changed));
        assert!(!store.update_student("missing", fields("X", "1", "c1")));

        assert_eq!(store.students()[0].id, s1.id);
        assert_eq!(store.students()[0].name, "Alicia");
        assert_eq!(store.students()[0].class_id, "c2");
        assert_eq!(
            store.students()[0].email.as_deref(),
            Some("alicia@example.com")
        );
        assert_eq!(store.students()[1], s2);
    }

    #[test]
    fn marking_twice_same_day_keeps_last_status() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let c = store.add_class("Grade 10", "A");
        let s1 = store.add_student(fields("Alice", "01", &c.id));
        store.start_session("Math");

        assert_eq!(store.student_status(&s1.id), None);
        store.mark_attendance(&s1.id, AttendanceStatus::Present);
        clock.advance(TimeDelta::minutes(5));
        store.mark_attendance(&s1.id, AttendanceStatus::Late);

        let today: Vec<_> = store
            .records()
            .iter()
            .filter(|r| r.student_id == s1.id && r.date == clock.today())
            .collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].status, AttendanceStatus::Late);
        assert_eq!(store.student_status(&s1.id), Some(AttendanceStatus::Late));
    }

    #[test]
    fn marking_on_a_new_day_keeps_previous_days() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        store.start_session("Math");
        store.mark_attendance("s1", AttendanceStatus::Absent);
        clock.advance(TimeDelta::days(1));
        assert_eq!(store.student_status("s1"), None);
        store.mark_attendance("s1", AttendanceStatus::Present);

        assert_eq!(store.records().len(), 2);
        assert_eq!(store.today_records().len(), 1);
        assert_eq!(store.student_status("s1"), Some(AttendanceStatus::Present));
    }

    #[test]
    fn mark_without_session_is_a_no_op() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        assert_eq!(store.mark_attendance("s1", AttendanceStatus::Present), None);
        assert!(store.records().is_empty());
        assert!(!store.is_busy());
        assert_eq!(kv.raw(KEY_RECORDS), None);
    }

    #[test]
    fn start_and_end_session() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);

        let started = store.start_session("Math");
        assert!(started.replaced.is_none());
        let active = store.current_session().expect("active session").clone();
        assert!(active.is_active);
        assert_eq!(active.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(active.subject, "Math");
        assert_eq!(active.end_time, None);
        assert!(kv.raw(KEY_CURRENT_SESSION).is_some());

        store.mark_attendance("s1", AttendanceStatus::Present);
        clock.advance(TimeDelta::minutes(45));
        let ended = store.end_session().expect("ended");
        assert!(!ended.is_active);
        assert_eq!(ended.end_time, Some(clock.now()));
        assert!(store.current_session().is_none());
        assert_eq!(kv.raw(KEY_CURRENT_SESSION), None);

        // Records survive, further marks are ignored.
        assert_eq!(store.student_status("s1"), Some(AttendanceStatus::Present));
        assert_eq!(store.mark_attendance("s1", AttendanceStatus::Late), None);
        assert_eq!(store.student_status("s1"), Some(AttendanceStatus::Present));
        assert_eq!(store.end_session(), None);
    }

    #[test]
    fn starting_over_an_active_session_replaces_it() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let first = store.start_session("Math").session;
        let second = store.start_session("Physics");
        assert_eq!(second.replaced, Some(first));
        assert_eq!(
            store.current_session().map(|s| s.subject.as_str()),
            Some("Physics")
        );
    }

    #[test]
    fn busy_flag_clears_after_delay() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        store.start_session("Math");
        store.mark_attendance("s1", AttendanceStatus::Present);
        assert!(store.is_busy());
        clock.advance(TimeDelta::milliseconds(299));
        assert!(store.is_busy());
        clock.advance(TimeDelta::milliseconds(1));
        assert!(!store.is_busy());
    }

    #[test]
    fn out_of_range_busy_delay_still_records_attendance() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = AttendanceStore::load(
            kv.clone(),
            Box::new(clock.clone()),
            Duration::from_millis(9_000_000_000_000_000_000),
        );
        store.start_session("Math");
        let record = store
            .mark_attendance("s1", AttendanceStatus::Present)
            .expect("recorded");
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(store.student_status("s1"), Some(AttendanceStatus::Present));
        assert!(!store.is_busy());
    }

    #[test]
    fn filtered_students_follow_selected_class() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let s1 = store.add_student(fields("Alice", "01", "c1"));
        let s2 = store.add_student(fields("Bob", "02", "c2"));

        assert_eq!(store.filtered_students(), vec![&s1, &s2]);
        store.select_class(Some("c2".into()));
        assert_eq!(store.selected_class(), Some("c2"));
        assert_eq!(store.filtered_students(), vec![&s2]);
        store.select_class(Some("c9".into()));
        assert!(store.filtered_students().is_empty());
        store.select_class(None);
        assert_eq!(store.filtered_students().len(), 2);
    }

    #[test]
    fn stats_example_single_present_student() {
        let kv = MemoryKv::new();
        kv.put_raw(
            KEY_CLASSES,
            r#"[{"id":"1","name":"Grade 10","section":"A"}]"#,
        );
        kv.put_raw(
            KEY_STUDENTS,
            r#"[{"id":"s1","classId":"1","name":"Alice","rollNumber":"01"}]"#,
        );
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);

        store.start_session("Math");
        store.mark_attendance("s1", AttendanceStatus::Present);
        assert_eq!(
            store.attendance_stats(),
            AttendanceStats {
                present: 1,
                absent: 0,
                late: 0,
                unmarked: 0,
                total: 1,
                attendance_rate: 100
            }
        );
    }

    #[test]
    fn stats_mix_filtered_total_with_system_wide_counts() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let a = store.add_student(fields("Alice", "01", "c1"));
        let b = store.add_student(fields("Bob", "02", "c2"));
        let c = store.add_student(fields("Cara", "03", "c2"));
        store.start_session("Math");
        store.mark_attendance(&a.id, AttendanceStatus::Present);
        store.mark_attendance(&b.id, AttendanceStatus::Absent);
        store.mark_attendance(&c.id, AttendanceStatus::Late);

        store.select_class(Some("c1".into()));
        let stats = store.attendance_stats();
        assert_eq!(stats.total, 1);
        assert_eq!((stats.present, stats.absent, stats.late), (1, 1, 1));
        assert_eq!(stats.unmarked, -2);
    }

    #[test]
    fn reload_round_trips_every_collection() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let c = store.add_class("Grade 10", "A");
        let mut f = fields("Alice", "01", &c.id);
        f.email = Some("alice@example.com".into());
        let s = store.add_student(f);
        store.start_session("Math");
        store.mark_attendance(&s.id, AttendanceStatus::Late);

        let reloaded = store_at(&kv, &clock);
        assert_eq!(reloaded.classes(), store.classes());
        assert_eq!(reloaded.students(), store.students());
        assert_eq!(reloaded.records(), store.records());
        assert_eq!(reloaded.current_session(), store.current_session());
        assert_eq!(reloaded.selected_class(), None);
    }

    #[test]
    fn malformed_entries_load_as_empty() {
        let kv = MemoryKv::new();
        kv.put_raw(KEY_CLASSES, "not json");
        kv.put_raw(KEY_STUDENTS, r#"{"oops":true}"#);
        kv.put_raw(KEY_RECORDS, r#"[{"id":"1"}]"#);
        kv.put_raw(KEY_CURRENT_SESSION, "null");
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let store = store_at(&kv, &clock);
        assert!(store.classes().is_empty());
        assert!(store.students().is_empty());
        assert!(store.records().is_empty());
        assert!(store.current_session().is_none());
    }

    #[test]
    fn write_failures_do_not_disturb_memory_state() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        kv.fail_writes(true);
        let c = store.add_class("Grade 10", "A");
        assert_eq!(store.classes(), &[c]);
        assert_eq!(kv.raw(KEY_CLASSES), None);

        kv.fail_writes(false);
        store.add_class("Grade 11", "B");
        let persisted: Vec<ClassEntity> =
            serde_json::from_str(&kv.raw(KEY_CLASSES).expect("persisted")).expect("parse");
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn history_and_labels_through_store() {
        let kv = MemoryKv::new();
        let clock = FixedClock::at("2024-06-10T09:00:00Z");
        let mut store = store_at(&kv, &clock);
        let c = store.add_class("Grade 10", "A");
        let s = store.add_student(fields("Alice", "01", &c.id));
        store.start_session("Math");
        store.mark_attendance(&s.id, AttendanceStatus::Present);
        clock.advance(TimeDelta::days(1));
        store.mark_attendance(&s.id, AttendanceStatus::Absent);

        let rows = store.history(Some(&c.id), None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].student_label, "Alice (01)");
        assert_eq!(rows[0].class_label, "Grade 10 - A");

        let st = store.student_history_stats(&s.id);
        assert_eq!((st.total, st.present, st.absent, st.attendance_rate), (2, 1, 1, 50));
        assert_eq!(store.class_history_stats(&c.id).student_count, 1);
        assert_eq!(store.overall_stats().total, 2);
        assert_eq!(store.class_label("gone"), stats::UNKNOWN_CLASS);
        assert_eq!(store.student_name(&s.id), "Alice");
    }
}
