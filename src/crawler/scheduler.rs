//! Task space generation
//!
//! The task space is the cross product of discovered courts and candidate
//! dates. Its ordering must be identical for identical inputs, since
//! count-based resumption skips a prefix of it.

use crate::config::TaskOrder;
use crate::model::{CalendarDate, CourtDescriptor, Task};
use crate::storage::ResumePlan;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// The ordered list of every search a run may perform
#[derive(Debug, Clone)]
pub struct TaskSpace {
    tasks: Vec<Task>,
    order: TaskOrder,
    fingerprint: String,
}

impl TaskSpace {
    /// Builds the cross product of `courts` and `dates`
    ///
    /// # Arguments
    ///
    /// * `courts` - Courts in discovery order
    /// * `dates` - Dates in chronological order
    /// * `order` - Whether courts or dates form the outer loop
    ///
    /// # Returns
    ///
    /// A task space with `courts.len() * dates.len()` tasks, each carrying
    /// its position as `sequence_index`.
    pub fn build(courts: &[CourtDescriptor], dates: &[CalendarDate], order: TaskOrder) -> Self {
        let courts: Vec<Arc<CourtDescriptor>> = courts.iter().cloned().map(Arc::new).collect();
        let mut tasks = Vec::with_capacity(courts.len() * dates.len());

        match order {
            TaskOrder::CourtMajor => {
                for court in &courts {
                    for &date in dates {
                        let sequence_index = tasks.len();
                        tasks.push(Task {
                            court: Arc::clone(court),
                            date,
                            sequence_index,
                        });
                    }
                }
            }
            TaskOrder::DateMajor => {
                for &date in dates {
                    for court in &courts {
                        let sequence_index = tasks.len();
                        tasks.push(Task {
                            court: Arc::clone(court),
                            date,
                            sequence_index,
                        });
                    }
                }
            }
        }

        let fingerprint = fingerprint_tasks(&tasks, order);
        Self {
            tasks,
            order,
            fingerprint,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn order(&self) -> TaskOrder {
        self.order
    }

    /// SHA-256 over the ordered task keys, hex-encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Tasks still to run under `plan`, in task-space order
    pub fn remaining(&self, plan: &ResumePlan) -> Vec<Task> {
        match plan {
            ResumePlan::Fresh => self.tasks.clone(),
            ResumePlan::SkipKnown(done) => self
                .tasks
                .iter()
                .filter(|task| !done.contains(&task.key()))
                .cloned()
                .collect(),
            ResumePlan::SkipFirst(offset) => {
                let skip = offset.offset.min(self.tasks.len());
                self.tasks[skip..].to_vec()
            }
        }
    }
}

fn fingerprint_tasks(tasks: &[Task], order: TaskOrder) -> String {
    let mut hasher = Sha256::new();
    hasher.update(order.as_str().as_bytes());
    for task in tasks {
        hasher.update(b"\n");
        hasher.update(task.court.type_code().as_bytes());
        hasher.update(b":");
        hasher.update(task.court.id.as_bytes());
        hasher.update(b"@");
        hasher.update(task.date.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}
