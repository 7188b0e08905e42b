pub mod cpu;
pub use cpu::*;

pub mod gpu;
pub use gpu::*;

pub mod timer;
pub use timer::*;

pub mod dma;
pub use dma::*;

pub mod joypad;
pub use joypad::*;

pub mod rtc;
pub use rtc::{Rtc, RtcState};

use super::mem::ioregs;
use super::mem::ioregs::Interrupt;
use super::{BackupController, MMU};

pub trait Clocked<B: BackupController> {
    /*
     * Advances the device by the given number of CPU cycles.
     * Devices only talk to the rest of the system through registers in MMU.
     */
    fn tick(&mut self, mmu: &mut MMU<B>, cycles: u64);
}
