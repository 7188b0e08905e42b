use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

// Per-instruction tracing. Very chatty, only useful with RUST_LOG=trace.
pub fn trace_cpu() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("GBA_TRACE_CPU", false))
}

pub fn trace_dma() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("GBA_TRACE_DMA", false))
}

pub fn trace_rtc() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("GBA_TRACE_RTC", false))
}

/*
 * Frontend settings. Every option has an environment fallback so the binary can be driven from scripts.
 */
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "frontend", derive(clap::Parser))]
#[cfg_attr(feature = "frontend", command(name = "gba", about = "Game Boy Advance emulator"))]
pub struct Config {
    /// Cartridge image to run.
    #[cfg_attr(feature = "frontend", arg(value_name = "ROM"))]
    pub rom: PathBuf,

    /// BIOS image. Without one the machine starts directly at the cartridge entry.
    #[cfg_attr(feature = "frontend", arg(long, env = "GBA_BIOS", value_name = "PATH"))]
    pub bios: Option<PathBuf>,

    /// Start at the cartridge entry even when a BIOS is given.
    #[cfg_attr(feature = "frontend", arg(long, env = "GBA_SKIP_BIOS",
                                          value_parser = clap::builder::FalseyValueParser::new()))]
    pub skip_bios: bool,

    /// Window scale factor.
    #[cfg_attr(feature = "frontend", arg(long, env = "GBA_SCALE", default_value_t = 3,
                                          value_parser = clap::value_parser!(u32).range(1..)))]
    pub scale: u32,

    /// Stop after N frames, used for headless smoke runs.
    #[cfg_attr(feature = "frontend", arg(long, value_name = "N"))]
    pub frames: Option<u64>,
}

impl Config {
    pub fn new(rom: PathBuf) -> Self {
        Self {
            rom: rom,
            bios: None,
            skip_bios: false,
            scale: 3,
            frames: None,
        }
    }

    /* Boots through the BIOS only when one is given and not skipped */
    pub fn direct_boot(&self) -> bool {
        self.skip_bios || self.bios.is_none()
    }

    // Backup memory lives next to the ROM.
    pub fn save_path(&self) -> PathBuf {
        let mut path = self.rom.clone();
        path.set_extension("sav");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_next_to_rom() {
        let config = Config::new(PathBuf::from("roms/game.gba"));
        assert_eq!(config.save_path(), PathBuf::from("roms/game.sav"));
        assert!(config.direct_boot());
    }

    #[cfg(feature = "frontend")]
    mod cli {
        use super::*;
        use clap::Parser;

        #[test]
        fn parses_flags() {
            let config = Config::try_parse_from(["gba", "--bios", "gba_bios.bin", "--scale", "2", "--frames", "10", "game.gba"]).unwrap();
            assert_eq!(config.rom, PathBuf::from("game.gba"));
            assert_eq!(config.bios, Some(PathBuf::from("gba_bios.bin")));
            assert_eq!(config.scale, 2);
            assert_eq!(config.frames, Some(10));
            assert!(!config.direct_boot());

            let config = Config::try_parse_from(["gba", "--bios", "gba_bios.bin", "--skip-bios", "game.gba"]).unwrap();
            assert!(config.direct_boot());
        }

        #[test]
        fn rejects_bad_input() {
            assert!(Config::try_parse_from(["gba"]).is_err());
            assert!(Config::try_parse_from(["gba", "--scale", "x", "game.gba"]).is_err());
            assert!(Config::try_parse_from(["gba", "--scale", "0", "game.gba"]).is_err());
            assert!(Config::try_parse_from(["gba", "--what", "game.gba"]).is_err());
        }
    }
}
