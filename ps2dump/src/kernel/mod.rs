/*!
Recovery of kernel state from the EE memory image.
*/

pub mod scanner;
pub mod thread;

#[doc(hidden)]
pub use scanner::{find_thread_table, ThreadTableLocation};
#[doc(hidden)]
pub use thread::{read_thread_table, ThreadDescriptor, ThreadList};
