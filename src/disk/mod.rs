pub mod block_device;
pub mod file_disk;
pub mod init;
pub mod types;

pub use block_device::BlockDevice;
pub use file_disk::FileDisk;
pub use init::{format_image, perform_disk_initialization, BootProgress};
pub use types::{Block, BlockIndex, ByteOffset, BLOCK_SIZE, DISK_SIZE};
