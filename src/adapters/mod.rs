//! Adapters — concrete implementations of the [`LineDriver`](crate::ports::LineDriver) port.
//!
//! | Adapter  | Implements | Connects to                              |
//! |----------|------------|------------------------------------------|
//! | `hal`    | LineDriver | any embedded-hal 1.0 `StatefulOutputPin` |
//! | `memory` | LineDriver | in-memory simulation with write journal  |

pub mod hal;
pub mod memory;
