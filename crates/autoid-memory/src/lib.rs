mod automation;
mod evidence;
mod notifier;
mod sheet;

pub use automation::{Reply, ScriptedAutomation};
pub use evidence::MemoryEvidenceStore;
pub use notifier::MemoryNotifier;
pub use sheet::{MemorySheet, SheetWrite, demo_rows};
