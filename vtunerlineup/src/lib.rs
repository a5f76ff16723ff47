//! # vtunerlineup - Services HDHomeRun du tuner
//!
//! Cette crate fournit tout ce qu'un client DVR interroge sur le tuner :
//!
//! - **Description** : `/device.xml` et `/discover.json`
//! - **Lineup** : `/lineup.json` et `/lineup.xml`, servies depuis un
//!   [`LineupStore`] partagé
//! - **Scan** : `/lineup_status.json` et `/lineup.post`, pilotés par le
//!   [`ScanController`]
//! - **Streaming** : `/auto/{channel_id}`, par redirection ou via un décodeur
//!   ffmpeg ([`StreamGateway`])
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use vtunerlineup::TunerServerExt;
//! use vtunerserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = vtunerconfig::get_config()?;
//! let mut server = ServerBuilder::from_config("VTuner", &config).build();
//! let tuner = server.init_tuner(&config).await?;
//! println!("{} channels", tuner.store.snapshot().channels().len());
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config_ext;
pub mod error;
pub mod lineup;
pub mod model;
pub mod scan;
pub mod server_ext;
pub mod stream;

pub use api::{TunerApiDoc, TunerState, create_api_router, create_router, render_lineup_xml};
pub use config_ext::TunerConfigExt;
pub use error::{Result, TunerError};
pub use lineup::{Lineup, LineupStore};
pub use model::{
    Channel, ConvertibleBoolean, DeviceIdentity, DiscoveryData, LineupItem, LineupStatus,
};
pub use scan::{ScanCommand, ScanController, merge_guide_channels};
pub use server_ext::TunerServerExt;
pub use stream::{DecoderStatus, SessionRegistry, StreamGateway, StreamSession, decoder_args};
