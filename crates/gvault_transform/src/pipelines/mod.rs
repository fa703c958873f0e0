//! Built-in [`TransformPipeline`](crate::TransformPipeline) implementations.

mod computer;
mod disc;
mod ps3;
mod psn;
mod xbox;

pub use computer::{ComputerPipeline, InstallImageBuilder, ToolInstallImageBuilder};
pub use disc::{disc_images, normalize_disc_images};
pub use ps3::{decrypt_ps3_iso, read_disc_key, Ps3DiscPipeline};
pub use psn::{extract_package, NetworkPackagePipeline, PackagePlatform};
pub use xbox::{rewrite_xbox_iso, XboxPipeline};
