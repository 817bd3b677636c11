//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter           | Implements         | Connects to                 |
//! |-------------------|--------------------|-----------------------------|
//! | `field_publisher` | EventSink          | Status fields               |
//! | `field_store`     | FieldStore         | In-memory field database    |
//! | `gpio_heads`      | SignalHeadPort     | embedded-hal output pins    |
//! | `log_sink`        | EventSink          | `log` facade                |
//! | `memory_store`    | ConfigPort         | In-memory key-value store   |
//! |                   | StoragePort        |                             |
//! | `time`            | TimePort           | Host clocks / manual clock  |

pub mod field_publisher;
pub mod field_store;
pub mod gpio_heads;
pub mod log_sink;
pub mod memory_store;
pub mod time;
