//! Execution strategies for block task lists.
//!
//! Dispatch produces one task per destination block tag, so tasks never
//! alias a destination and can run in any order or concurrently. Within a
//! task, operands are applied in discovery order; serial and threaded runs
//! therefore produce bit-identical results.

use rayon::prelude::*;

/// A unit of block work bound to exactly one destination block.
pub trait Task: Send {
    /// Execute the task.
    fn run(&mut self);

    /// Approximate flop count, used only to order work under the threaded
    /// strategy.
    fn cost(&self) -> u64 {
        1
    }
}

/// How a task list is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Run tasks one after another on the calling thread.
    Serial,
    /// Run tasks on the rayon pool, largest first.
    ///
    /// Falls back to serial when the list has at most `serial_threshold`
    /// tasks, where pool overhead would dominate.
    Threaded { serial_threshold: usize },
}

impl Default for Execution {
    fn default() -> Self {
        Execution::Serial
    }
}

impl Execution {
    /// Run every task in the list to completion.
    pub fn run<T: Task>(self, tasks: &mut [T]) {
        match self {
            Execution::Serial => {
                for task in tasks.iter_mut() {
                    task.run();
                }
            }
            Execution::Threaded { serial_threshold } => {
                if tasks.len() <= serial_threshold {
                    for task in tasks.iter_mut() {
                        task.run();
                    }
                } else {
                    // Schedule the heaviest tasks first for better balance.
                    tasks.sort_by(|a, b| b.cost().cmp(&a.cost()));
                    tasks.par_iter_mut().for_each(|task| task.run());
                }
            }
        }
    }
}
