/*!
Kernel thread table and saved thread contexts.

The kernel keeps a fixed table of [`MAX_THREADS`] thread control blocks. When a
thread is switched out its registers are pushed onto its own stack and the stack
pointer is written back into its control block, so the full register state of every
thread that is not running can be rebuilt from memory.
*/

use dataview::Pod;
use log::{debug, info};

use crate::error::{Error, ErrorKind, ErrorOrigin, Result};
use crate::savestate::memory::MemoryImage;
use crate::savestate::regs::{gpr, RegisterSet, GPR_COUNT};

/// Number of entries in the thread table.
pub const MAX_THREADS: usize = 256;

/// Size of a single thread control block.
pub const TCB_SIZE: usize = 68;

/// Size of a context saved on a thread stack.
pub const CONTEXT_SIZE: usize = 640;

/// Number of FPU words saved after the general purpose registers.
pub const FPR_COUNT: usize = 32;

pub const THS_FREE: u32 = 0x00;
pub const THS_RUN: u32 = 0x01;
pub const THS_READY: u32 = 0x02;
pub const THS_WAIT: u32 = 0x04;
pub const THS_SUSPEND: u32 = 0x08;
pub const THS_WAITSUSPEND: u32 = THS_WAIT | THS_SUSPEND;
pub const THS_DORMANT: u32 = 0x10;

pub const TSW_NONE: u32 = 0;
pub const TSW_SLEEP: u32 = 1;
pub const TSW_SEMA: u32 = 2;

/// Returns a human readable name for a thread status code.
pub fn status_name(status: u32) -> &'static str {
    match status {
        THS_FREE => "free",
        THS_RUN => "running",
        THS_READY => "ready",
        THS_WAIT => "waiting",
        THS_SUSPEND => "suspended",
        THS_WAITSUSPEND => "waiting, suspended",
        THS_DORMANT => "dormant",
        _ => "unknown",
    }
}

/// Returns a human readable name for a wait type.
pub fn wait_type_name(wait_type: u32) -> &'static str {
    match wait_type {
        TSW_NONE => "none",
        TSW_SLEEP => "sleep",
        TSW_SEMA => "semaphore",
        _ => "unknown",
    }
}

/// A thread control block as laid out in kernel memory.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod)]
pub struct ThreadControlBlock {
    pub prev: u32,
    pub next: u32,
    pub status: u32,
    pub pc: u32,
    pub sp: u32,
    pub gp: u32,
    pub priority: u16,
    pub init_priority: u16,
    pub wait_type: u32,
    pub sema_id: u32,
    pub wakeup_count: u32,
    pub attr: u32,
    pub option: u32,
    pub entry_init: u32,
    pub argc: u32,
    pub argv: u32,
    pub stack_init: u32,
    pub stack_size: u32,
}

crate::impl_byte_swap!(ThreadControlBlock {
    prev,
    next,
    status,
    pc,
    sp,
    gp,
    priority,
    init_priority,
    wait_type,
    sema_id,
    wakeup_count,
    attr,
    option,
    entry_init,
    argc,
    argv,
    stack_init,
    stack_size,
});

/// Registers pushed onto the stack of a switched out thread.
///
/// General purpose slots 0, 26 and 27 never need saving (`$zero`, `$k0`, `$k1`),
/// the kernel stores SA, HI and LO in them instead.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod)]
pub struct ThreadContext {
    pub gpr: [[u64; 2]; GPR_COUNT],
    pub fpr: [u32; FPR_COUNT],
}

crate::impl_byte_swap!(ThreadContext { gpr, fpr });

impl ThreadContext {
    /// Returns the lower 64 bits of slot `index`.
    pub fn slot(&self, index: usize) -> u64 {
        self.gpr[index][0]
    }

    /// Rebuilds the register set of the thread, using `pc` as the program counter.
    pub fn to_registers(&self, pc: u32) -> RegisterSet {
        let mut regs = RegisterSet {
            pc,
            ..RegisterSet::default()
        };

        for (dst, slot) in regs.gpr.iter_mut().zip(self.gpr.iter()) {
            *dst = slot[0];
        }

        regs.sa = self.slot(gpr::ZERO) as u32;
        regs.hi = self.slot(gpr::K0);
        regs.lo = self.slot(gpr::K1);

        regs.gpr[gpr::ZERO] = 0;
        regs.gpr[gpr::K0] = 0;
        regs.gpr[gpr::K1] = 0;

        regs
    }
}

/// A thread recovered from the thread table.
#[derive(Clone, Debug)]
pub struct ThreadDescriptor {
    /// Index in the thread table.
    pub id: u32,
    pub status: u32,
    pub pc: u32,
    pub sp: u32,
    pub gp: u32,
    pub priority: u16,
    pub init_priority: u16,
    pub wait_type: u32,
    pub wakeup_count: u32,
    /// Entry point the thread was created with.
    pub entry_init: u32,
    pub argc: u32,
    pub argv: u32,
    pub stack_init: u32,
    pub stack_size: u32,
    pub registers: RegisterSet,
    /// Saved FPU words, in register order.
    pub fpr: [u32; FPR_COUNT],
}

impl ThreadDescriptor {
    fn from_context(id: u32, tcb: &ThreadControlBlock, ctx: &ThreadContext) -> Self {
        Self {
            id,
            status: tcb.status,
            pc: tcb.pc,
            sp: tcb.sp,
            gp: tcb.gp,
            priority: tcb.priority,
            init_priority: tcb.init_priority,
            wait_type: tcb.wait_type,
            wakeup_count: tcb.wakeup_count,
            entry_init: tcb.entry_init,
            argc: tcb.argc,
            argv: tcb.argv,
            stack_init: tcb.stack_init,
            stack_size: tcb.stack_size,
            registers: ctx.to_registers(tcb.pc),
            fpr: ctx.fpr,
        }
    }

    pub fn status_name(&self) -> &'static str {
        status_name(self.status)
    }

    pub fn wait_type_name(&self) -> &'static str {
        wait_type_name(self.wait_type)
    }
}

/// Result of walking the thread table.
#[derive(Clone, Debug, Default)]
pub struct ThreadList {
    /// Id of the thread that was running when the savestate was taken.
    pub running: Option<u32>,
    /// Every thread that is neither free nor running, in table order.
    pub threads: Vec<ThreadDescriptor>,
}

/// Reads the control block of thread `id` from the table at `base`.
pub fn read_tcb(mem: &MemoryImage, base: u32, id: u32) -> Result<ThreadControlBlock> {
    let addr = base.wrapping_add(id.wrapping_mul(TCB_SIZE as u32));
    mem.read::<ThreadControlBlock>(addr)
        .map_err(|err| Error(ErrorOrigin::ThreadTable, err.1))
}

/// Reads the context saved on the stack at `sp` and checks it belongs to that stack.
pub fn read_context(mem: &MemoryImage, id: u32, sp: u32) -> Result<ThreadContext> {
    let ctx = mem
        .read::<ThreadContext>(sp)
        .map_err(|err| Error(ErrorOrigin::ThreadContext, err.1))?;

    // the saved $sp points above the pushed context, addresses are compared as 32 bit
    let saved_sp = ctx.slot(gpr::SP) as u32;
    let expected = sp.wrapping_add(CONTEXT_SIZE as u32);
    if saved_sp != expected {
        return Err(
            Error(ErrorOrigin::ThreadContext, ErrorKind::StackPointerMismatch).log_error(format!(
                "thread {}: saved sp {:#010x}, expected {:#010x}",
                id, saved_sp, expected
            )),
        );
    }

    Ok(ctx)
}

/// Walks the thread table at `base`.
pub fn read_thread_table(mem: &MemoryImage, base: u32) -> Result<ThreadList> {
    let mut list = ThreadList::default();

    for id in 0..MAX_THREADS as u32 {
        let tcb = read_tcb(mem, base, id)?;

        match tcb.status {
            THS_FREE => continue,
            THS_RUN => {
                debug!("thread {} is running", id);
                list.running.get_or_insert(id);
            }
            _ => {
                let ctx = read_context(mem, id, tcb.sp)?;
                let thread = ThreadDescriptor::from_context(id, &tcb, &ctx);
                info!(
                    "thread {}: {} pc={:#010x} sp={:#010x} priority={}",
                    id,
                    thread.status_name(),
                    thread.pc,
                    thread.sp,
                    thread.priority
                );
                list.threads.push(thread);
            }
        }
    }

    Ok(list)
}
