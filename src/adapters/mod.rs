//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                         | Connects to              |
//! |--------------|------------------------------------|--------------------------|
//! | `hardware`   | InputPort, MotorPort, BuzzerPort,  | GPIO buttons, DRV8825,   |
//! |              | DistanceBus, TimePort, DelayNs     | piezo, I2C sensor        |
//! | `log_sink`   | EventSink                          | Serial log output        |
//! | `time`       | TimePort, DelayNs                  | ESP32 system timer       |
//! | `uart_modem` | ModemTransport                     | SIM800L on UART1         |

pub mod hardware;
pub mod log_sink;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart_modem;
