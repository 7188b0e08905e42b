use std::fs;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::Parser;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;

use gba::config::Config;
use gba::*;

/* 59.73 Hz */
const FRAME_TIME: Duration = Duration::from_micros(16_743);

fn button(key: Keycode) -> Option<Button> {
    match key {
        Keycode::Z => Some(Button::A),
        Keycode::X => Some(Button::B),
        Keycode::Backspace => Some(Button::Select),
        Keycode::Return => Some(Button::Start),
        Keycode::Right => Some(Button::Right),
        Keycode::Left => Some(Button::Left),
        Keycode::Up => Some(Button::Up),
        Keycode::Down => Some(Button::Down),
        Keycode::S => Some(Button::R),
        Keycode::A => Some(Button::L),
        _ => None,
    }
}

/* Known game codes first, then a scan of the image for save library strings */
fn backup_type(rom: &[Byte]) -> BackupType {
    let database = BackupDatabase::default();
    let known = CartHeader::parse(rom).and_then(|header| database.lookup(&header.game_code()));
    match known {
        Some(kind) => kind,
        None => BackupType::detect(rom),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::parse();
    let rom = fs::read(&config.rom).with_context(|| format!("reading {}", config.rom.display()))?;
    let kind = backup_type(&rom);
    log::info!("Backup: {}", kind);

    let mut runtime = match &config.bios {
        Some(path) if !config.direct_boot() => {
            let bios = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Runtime::with_bios(&bios, kind.create())?
        }
        _ => {
            let mut runtime = Runtime::new(kind.create());
            runtime.skip_bios();
            runtime
        }
    };
    let (size, mapped) = runtime.load(rom)?;
    log::info!("Loaded {} bytes at 0x{:08X}..0x{:08X}", size, mapped.start, mapped.end);

    let save_path = config.save_path();
    if runtime.load_save(&save_path)? {
        log::info!("Loaded save from {}", save_path.display());
    }

    let sdl = sdl2::init().map_err(|e| anyhow!(e))?;
    let video = sdl.video().map_err(|e| anyhow!(e))?;
    let window = video
        .window("gba", SCREEN_WIDTH as u32 * config.scale, SCREEN_HEIGHT as u32 * config.scale)
        .position_centered()
        .build()?;
    let mut canvas = window.into_canvas().accelerated().build()?;
    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGB24, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)?;
    let mut event_pump = sdl.event_pump().map_err(|e| anyhow!(e))?;

    let mut frames = 0u64;
    'running: loop {
        let started = Instant::now();
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => break 'running,
                Event::KeyDown { keycode: Some(key), .. } => {
                    if let Some(b) = button(key) { runtime.set_button(b, true); }
                }
                Event::KeyUp { keycode: Some(key), .. } => {
                    if let Some(b) = button(key) { runtime.set_button(b, false); }
                }
                _ => {}
            }
        }

        let frame = runtime.frame();
        texture.with_lock(None, |buffer: &mut [u8], pitch: usize| {
            for (y, row) in frame.chunks(SCREEN_WIDTH).enumerate() {
                let dest = &mut buffer[y * pitch..y * pitch + SCREEN_WIDTH * 3];
                for (&(r, g, b), px) in row.iter().zip(dest.chunks_mut(3)) {
                    px[0] = r;
                    px[1] = g;
                    px[2] = b;
                }
            }
        }).map_err(|e| anyhow!(e))?;
        canvas.clear();
        canvas.copy(&texture, None, None).map_err(|e| anyhow!(e))?;
        canvas.present();

        frames += 1;
        if config.frames.map_or(false, |limit| frames >= limit) {
            break;
        }
        if let Some(rest) = FRAME_TIME.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let written = runtime.write_save(&save_path).with_context(|| format!("writing {}", save_path.display()))?;
    if written > 0 {
        log::info!("Saved {} bytes to {}", written, save_path.display());
    }
    Ok(())
}
