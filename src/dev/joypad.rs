#![allow(non_snake_case)]

use super::*;

/* Bit positions in KEYINPUT / KEYCNT */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    R = 8,
    L = 9,
}

const KEY_MASK: u16 = 0x03FF;
const KEYCNT_IRQ: u32 = 14;
/* All selected keys instead of any of them */
const KEYCNT_AND: u32 = 15;

#[derive(Debug, Default)]
pub struct Joypad {
    pressed: u16,
    /* last value of the KEYCNT condition, the interrupt fires on its rising edge */
    condition: bool,
}

impl Joypad {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let bit = 1 << button as u16;
        if pressed { self.pressed |= bit } else { self.pressed &= !bit }
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.pressed & (1 << button as u16) != 0
    }

    pub fn step<B: BackupController>(&mut self, mmu: &mut MMU<B>) {
        // Active low
        Joypad::_KEYINPUT(mmu, !self.pressed & KEY_MASK);

        let keycnt = Joypad::KEYCNT(mmu);
        let selected = keycnt & KEY_MASK;
        let condition = if keycnt & (1 << KEYCNT_AND) != 0 {
            selected != 0 && self.pressed & selected == selected
        } else {
            self.pressed & selected != 0
        };

        if condition && !self.condition && keycnt & (1 << KEYCNT_IRQ) != 0 {
            mmu.request_interrupt(Interrupt::Keypad);
        }
        self.condition = condition;
    }

    pub fn KEYINPUT<B: BackupController>(mmu: &MMU<B>) -> u16 {
        mmu.io16(ioregs::KEYINPUT)
    }
    fn _KEYINPUT<B: BackupController>(mmu: &mut MMU<B>, value: u16) {
        mmu.set_io16(ioregs::KEYINPUT, value)
    }

    pub fn KEYCNT<B: BackupController>(mmu: &MMU<B>) -> u16 {
        mmu.io16(ioregs::KEYCNT)
    }
}
