/*!
Conversion of PCSX2 savestates into ELF core files.

A savestate is a zip archive holding, among other things, the Emotion Engine register
block and a full image of EE RAM. This crate decodes both, recovers the register state
of every kernel thread that was switched out when the savestate was taken, and writes
everything as a MIPS core file that generic debuggers can load.

The main entry point is [`run`](dump/fn.run.html). The pieces are usable on their own:
[savestate decoding](savestate/index.html), [thread recovery](kernel/index.html) and
[the core file writer](elf/index.html).

# Examples

```no_run
use ps2dump::prelude::v1::*;

let config = DumpConfig::new().recover_threads(true);
let summary = run_with_config("game.p2s", "game.core", &config).unwrap();
println!("wrote {} contexts", summary.contexts);
```
*/

pub mod error;
#[doc(hidden)]
pub use error::*;

#[macro_use]
pub mod types;

pub mod archive;
#[doc(hidden)]
pub use archive::*;

pub mod savestate;

pub mod kernel;

pub mod elf;

pub mod dump;
#[doc(hidden)]
pub use dump::*;

pub mod prelude {
    pub mod v1 {
        pub use crate::archive::*;
        pub use crate::dump::*;
        pub use crate::elf::*;
        pub use crate::error::*;
        pub use crate::kernel::*;
        pub use crate::savestate::memory::MemoryImage;
        pub use crate::savestate::regs::RegisterSet;
        pub use crate::savestate::*;
    }
    pub use v1::*;
}
