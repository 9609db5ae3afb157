//! Flash command sequencing and persistence, end to end through the
//! simulated chip.

use muxbus_core::flash::{opcodes::Status, EraseWait, Flash, FlashAddress, FlashConfig};
use muxbus_core::mux::BusMux;
use muxbus_core::scores;
use muxbus_core::usci::{SpiConfig, Timeout};
use muxbus_sim::{flash, SimUnit, TraceEvent};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spi_config() -> SpiConfig {
    SpiConfig {
        timeout: Timeout::Micros(1_000_000),
    }
}

#[test]
fn identification_reads_the_jedec_bytes() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());

    let id = chip.read_id().unwrap();
    assert_eq!(id.manufacturer, flash::JEDEC_MANUFACTURER);
    assert_eq!(id.memory_type, flash::JEDEC_MEMORY_TYPE);
    assert_eq!(id.capacity, flash::JEDEC_CAPACITY);
}

#[test]
fn programmed_data_reads_back_after_the_stale_byte() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());

    let data = [0xDE, 0xAD, 0xBE, 0xEF];
    chip.write(FlashAddress(0x000100), &data).unwrap();

    let mut out = [0u8; 5];
    chip.read(FlashAddress(0x000100), &mut out).unwrap();
    assert_eq!(out[1..], data, "payload starts after the stale byte");
}

#[test]
fn writing_erases_the_whole_containing_sector() {
    init_logs();
    let mut unit = SimUnit::new();
    // pattern inside sector 1 and spilling into sector 2
    unit.flash_mut().preload(0x010000, &[0x5A; 16]);
    unit.flash_mut().preload(0x01FFF0, &[0x5A; 32]);
    let mut mux = BusMux::new(unit);
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());

    chip.write(FlashAddress(0x014000), &[0x77]).unwrap();

    // non-written bytes of the sector read back erased, over the wire
    let mut out = [0u8; 4];
    chip.read(FlashAddress(0x010000), &mut out).unwrap();
    assert_eq!(out[1..], [0xFF, 0xFF, 0xFF]);

    drop(chip);
    let unit = mux.release();
    assert_eq!(unit.flash().peek(0x014000), 0x77);
    assert_eq!(unit.flash().peek(0x01FFFF), 0xFF);
    assert_eq!(unit.flash().peek(0x020000), 0x5A, "the next sector is untouched");
}

#[test]
fn busy_tracks_the_erase_window() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let config = FlashConfig {
        // return early on purpose, well inside the chip's busy window
        erase_wait: EraseWait::FixedDelay { us: 1_000 },
    };
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), config);

    chip.erase(FlashAddress(0)).unwrap();
    assert!(chip.busy().unwrap(), "write-in-progress right after the erase");

    chip.delay_us(flash::ERASE_BUSY_US as u32);
    assert!(!chip.busy().unwrap(), "clear once the window has passed");
}

#[test]
fn default_delay_outlasts_the_chip() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());

    chip.erase(FlashAddress(0x020000)).unwrap();
    assert!(!chip.busy().unwrap());
}

#[test]
fn poll_wait_watches_the_status_register() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let config = FlashConfig {
        erase_wait: EraseWait::Poll {
            interval_us: 50_000,
            timeout_us: 2_000_000,
        },
    };
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), config);

    chip.write(FlashAddress(0), &[0x42]).unwrap();

    drop(chip);
    let unit = mux.release();
    assert_eq!(unit.flash().peek(0), 0x42);
    let wip = Status::WIP.bits();
    let in_progress_answers = unit
        .trace()
        .count(|e| matches!(e, TraceEvent::RxByte(b) if *b == wip));
    assert!(
        in_progress_answers >= 1,
        "at least one status read saw the erase still running"
    );
}

#[test]
fn chip_select_brackets_complete_byte_frames() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());
    chip.read_id().unwrap();

    drop(chip);
    let unit = mux.release();
    let trace = unit.trace();
    let deassert = trace
        .position(|e| matches!(e, TraceEvent::ChipSelect(false)))
        .unwrap();
    let bytes = trace.positions(|e| matches!(e, TraceEvent::TxByte(_)));
    // opcode plus one filler per identification byte
    assert_eq!(bytes.len(), 5);
    assert!(
        bytes.iter().all(|&i| i < deassert),
        "every byte finishes clocking inside the selection window"
    );
}

#[test]
fn best_scores_survive_a_power_cycle() {
    init_logs();
    let mut mux = BusMux::new(SimUnit::new());
    {
        let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());
        scores::store(&mut chip, &[9, 7, 4]).unwrap();
    }

    // a fresh acquisition models the next boot
    let mut chip = Flash::new(mux.acquire_spi(spi_config()), FlashConfig::default());
    assert_eq!(scores::load(&mut chip).unwrap(), [9, 7, 4]);
}
