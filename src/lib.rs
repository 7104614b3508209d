/*!
# sam-fdc

A Rust library emulating the VL1772 floppy disk controller of the SAM Coupe,
together with the disk image formats it reads and writes.

## Features

- Register-level VL1772 emulation: Type 1 head positioning, sector reads and
  writes, Read Address, Read Track and Write Track, Force Interrupt
- MGT, SAD, Extended DSK and bootable SBT images, optionally gzip-compressed
- Pass-through to real floppy devices with asynchronous completion
- Synthesised raw tracks with CRC errors reproduced for copy-protected disks

## Quick Start

```rust,no_run
use sam_fdc::{Drive, DriveOptions};

let mut drive = Drive::new(DriveOptions::default());
drive.insert_path("disk.mgt", false)?;

// Read cylinder 0, sector 1 through the controller ports
drive.out_port(0xE2, 1);
drive.out_port(0xE0, 0x80);
let mut data = Vec::new();
while drive.in_port(0xE0) & 0x02 != 0 {
    data.push(drive.in_port(0xE3));
}

// Called once per emulated frame
drive.frame_end();

// Modified images are saved on eject
drive.eject();
# Ok::<(), sam_fdc::DiskError>(())
```

## Modules

- `drive`: the controller state machine and raw track handling
- `image`: disk image formats behind the [`Disk`] trait
- `io`: file, memory and gzip streams
- `format`: geometry and format constants
- `fdc`: register and status definitions
- `crc`: CRC-16 used by ID and data fields
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// CRC-16/IBM-3740 checksum
pub mod crc;
/// VL1772 controller with an attached drive
pub mod drive;
/// Error types and Result alias
pub mod error;
/// Controller registers, commands and status bits
pub mod fdc;
/// Disk geometry and format constants
pub mod format;
/// Disk image formats
pub mod image;
/// Byte streams backing disk images
pub mod io;

// Re-export common types
pub use drive::{Drive, DriveOptions};
pub use error::{DiskError, Result};
pub use fdc::{Command, Register, Registers, Status};
pub use format::{DiskKind, Geometry};
pub use image::{
    DeviceCommand, Disk, EdskDisk, FileDisk, FloppyDevice, FloppyDisk, FloppySector, FloppyTrack,
    IdField, MgtDisk, SadDisk, Sector,
};
pub use io::{FileStream, GzipStream, MemStream, Stream};
