//! SIM800L transport over UART1 (ESP-IDF only).
//!
//! 9600 baud 8N1 plus the active-low RST line.  Reads never block; the AT
//! layer polls and owns every timeout.

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::uart::UartDriver;
use log::{info, warn};

use crate::app::ports::ModemTransport;
use crate::error::ModemError;

/// RST held low this long to reset the module.
const RESET_PULSE_MS: u32 = 100;
/// Boot time after releasing RST.
const BOOT_SETTLE_MS: u32 = 3000;

pub struct UartModem {
    uart: UartDriver<'static>,
    reset: PinDriver<'static, AnyOutputPin, Output>,
}

impl UartModem {
    /// Takes a configured UART and the reset pin; RST idles high.
    pub fn new(uart: UartDriver<'static>, mut reset: PinDriver<'static, AnyOutputPin, Output>) -> Self {
        if let Err(e) = reset.set_high() {
            warn!("GSM: RST pin init failed: {:?}", e);
        }
        Self { uart, reset }
    }
}

impl ModemTransport for UartModem {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.uart.write(rest).map_err(|e| {
                warn!("GSM: UART write failed: {:?}", e);
                ModemError::Transport
            })?;
            if n == 0 {
                return Err(ModemError::Transport);
            }
            rest = &rest[n..];
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.uart.read(buf, 0).unwrap_or(0)
    }

    fn reset(&mut self) {
        info!("GSM: hardware reset");
        if let Err(e) = self.reset.set_low() {
            warn!("GSM: RST assert failed: {:?}", e);
        }
        FreeRtos::delay_ms(RESET_PULSE_MS);
        if let Err(e) = self.reset.set_high() {
            warn!("GSM: RST release failed: {:?}", e);
        }
        FreeRtos::delay_ms(BOOT_SETTLE_MS);
    }
}
