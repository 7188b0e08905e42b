use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;

use super::*;
use crate::error::Result;

/* CPU cycles per frame, 228 lines of 1232 cycles */
pub const CPU_CYCLES_PER_FRAME: u64 = FRAME_CYCLES;

/*
 * Runtime connects the CPU with everything stored in State (memory, IO devices).
 * The split exists because the CPU needs &mut State while being a field next to it: self.cpu.step(self) won't borrow.
 */
pub struct Runtime<B: BackupController> {
    pub cpu: CPU,
    pub state: State<B>,

    cpu_cycles: u64,
    frame_cycles: u64,
}

impl<B: BackupController> Runtime<B> {
    /* Machine without a boot ROM. Call skip_bios() before running it. */
    pub fn new(backup: B) -> Self {
        Self {
            cpu: CPU::new(),
            state: State::new(backup),
            cpu_cycles: 0,
            frame_cycles: 0,
        }
    }

    /* Machine that starts executing the boot ROM at address 0 */
    pub fn with_bios(bios: &[Byte], backup: B) -> Result<Self> {
        let mut runtime = Runtime::new(backup);
        runtime.state.mmu.load_bios(bios)?;
        Ok(runtime)
    }

    /* Puts the machine in the state the boot ROM would leave it in */
    pub fn skip_bios(&mut self) {
        self.cpu.skip_bios();
        self.state.mmu.ioregs.set(ioregs::POSTFLG, 1);
    }

    /* Maps the program image into the cartridge windows */
    pub fn load(&mut self, rom: Vec<Byte>) -> Result<(usize, Range<Addr>)> {
        self.state.mmu.cart.load(rom)
    }

    /* Restores backup contents from a save file. Ok(false) when there is no file yet. */
    pub fn load_save(&mut self, path: &Path) -> Result<bool> {
        match fs::read(path) {
            Ok(data) => {
                self.state.mmu.cart.backup.load_data(&data);
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /* Carts without a save chip write nothing */
    pub fn write_save(&self, path: &Path) -> Result<usize> {
        let data = self.state.mmu.cart.backup.data();
        if !data.is_empty() {
            fs::write(path, data)?;
        }
        Ok(data.len())
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.state.joypad.set_button(button, pressed);
    }

    /*
     * One scheduler iteration: the CPU executes an instruction (or idles when halted),
     * devices catch up by the same number of cycles, then interrupts and DMA are serviced.
     */
    pub fn step(&mut self) -> u64 {
        let mut cycles = self.cpu.step(&mut self.state);
        self.advance(cycles);
        self.state.joypad.step(&mut self.state.mmu);

        let entry = self.cpu.interrupts(&mut self.state);
        if entry > 0 {
            self.advance(entry);
            cycles += entry;
        }

        if self.state.dma.active() {
            let stall = self.state.dma.step(&mut self.state.mmu);
            // Transfers into the I/O window can move LYC, start timers or other channels
            self.state.gpu.update(&mut self.state.mmu);
            self.state.dispatch();
            self.advance(stall);
            cycles += stall;
        }

        self.cpu_cycles += cycles;
        self.frame_cycles += cycles;
        cycles
    }

    /* Clocked devices catch up, blanking periods they entered start DMA channels */
    fn advance(&mut self, cycles: u64) {
        self.state.timer.tick(&mut self.state.mmu, cycles);
        self.state.gpu.tick(&mut self.state.mmu, cycles);
        for timing in self.state.gpu.take_blanks() {
            self.state.dma.trigger(&self.state.mmu, timing);
        }
    }

    /*
     * Runs one frame worth of cycles and returns the picture.
     * Overshoot of the last instruction is carried into the next frame.
     */
    pub fn frame(&mut self) -> &[Color] {
        while self.frame_cycles < CPU_CYCLES_PER_FRAME {
            self.step();
        }
        self.frame_cycles -= CPU_CYCLES_PER_FRAME;
        &self.state.gpu.framebuff
    }

    pub fn cpu_cycles(&self) -> u64 { self.cpu_cycles }
    pub fn reset_cycles(&mut self) {
        self.cpu_cycles = 0;
        self.frame_cycles = 0;
    }
}

/*
 * State is middleware between CPU<->Memory/IO. Every access the CPU makes goes through here,
 * so register writes that start something (DMA enable, timer start, halt) reach their device
 * right after the write lands in the MMU.
 */
pub struct State<B: BackupController> {
    pub gpu: GPU,
    pub timer: Timer,
    pub dma: DMA,
    pub joypad: Joypad,
    pub mmu: MMU<B>,
    halt_request: bool,
}

impl<B: BackupController> State<B> {
    pub fn new(backup: B) -> Self {
        let mut mmu = MMU::new(backup);
        let gpu = GPU::new(&mut mmu);
        Self {
            gpu: gpu,
            timer: Timer::new(),
            dma: DMA::new(),
            joypad: Joypad::new(),
            mmu: mmu,
            halt_request: false,
        }
    }

    pub fn read8(&mut self, addr: Addr) -> Byte {
        self.mmu.read8(addr)
    }

    pub fn read16(&mut self, addr: Addr) -> u16 {
        self.mmu.read16(addr)
    }

    pub fn read32(&mut self, addr: Addr) -> u32 {
        self.mmu.read32(addr)
    }

    pub fn write8(&mut self, addr: Addr, value: Byte) {
        self.mmu.write8(addr, value);
        self.written(addr, 1);
    }

    pub fn write16(&mut self, addr: Addr, value: u16) {
        self.mmu.write16(addr, value);
        self.written(addr, 2);
    }

    pub fn write32(&mut self, addr: Addr, value: u32) {
        self.mmu.write32(addr, value);
        self.written(addr, 4);
    }

    /* HALTCNT was written since the last call */
    pub fn take_halt(&mut self) -> bool {
        std::mem::replace(&mut self.halt_request, false)
    }

    fn written(&mut self, addr: Addr, len: Addr) {
        // LYC lives in the upper byte of DISPSTAT, the match flag has to follow it
        if addr <= ioregs::DISPSTAT + 1 && addr.saturating_add(len) > ioregs::DISPSTAT {
            self.gpu.update(&mut self.mmu);
        }
        if self.mmu.ioregs.has_events() {
            self.dispatch();
        }
    }

    /* Hands register side effects queued by IORegs to the devices */
    pub fn dispatch(&mut self) {
        for event in self.mmu.ioregs.take_events() {
            match event {
                IoEvent::DmaEnable(ch) => self.dma.enable(&self.mmu, ch),
                IoEvent::TimerStart(ch) => self.timer.start(&self.mmu, ch),
                IoEvent::Halt => self.halt_request = true,
            }
        }
    }
}
