//! Bundled elements.
//!
//! | factory | pads | notes |
//! |---|---|---|
//! | `filesrc`, `urisrc`, `souphttpsrc` | → bytes | file and HTTP input |
//! | `audiotestsrc`, `espeak` | → audio | generated / synthesised audio |
//! | `decodebin` | bytes → audio | symphonia |
//! | `audioconvert`, `audioresample`, `capsfilter`, `volume` | audio → audio | |
//! | `queue` | any → any | passthrough |
//! | `wavenc` | audio → bytes | hound |
//! | `filesink`, `fakesink` | → | |
//! | `autoaudiosink`, `alsasink`, `pulsesink` | audio → | cpal default output |
//! | `playbin` | bin | `urisrc ! decodebin ! audioconvert ! volume ! <sink>` |

mod audio_sink;
mod convert;
mod decode;
mod espeak;
mod playbin;
mod sinks;
mod sources;
mod uri;
mod wav;

pub use audio_sink::AudioDeviceSink;
pub use convert::{AudioConvert, AudioResample, CapsFilter, Queue, Volume};
pub use decode::DecodeBin;
pub use espeak::Espeak;
pub use playbin::PlayBin;
pub use sinks::{FakeSink, FileSink};
pub use sources::{AudioTestSrc, FileSrc};
pub use uri::{SoupHttpSrc, UriSrc};
pub use wav::WavEnc;

use super::registry::Registry;

/// Register every bundled element.
pub fn register_defaults(registry: &mut Registry) {
    registry
        .register(FileSrc)
        .register(UriSrc)
        .register(SoupHttpSrc)
        .register(AudioTestSrc)
        .register(Espeak)
        .register(DecodeBin)
        .register(AudioConvert)
        .register(AudioResample)
        .register(CapsFilter)
        .register(Volume)
        .register(Queue)
        .register(WavEnc)
        .register(FileSink)
        .register(FakeSink)
        .register(AudioDeviceSink::new("autoaudiosink"))
        .register(AudioDeviceSink::new("alsasink"))
        .register(AudioDeviceSink::new("pulsesink"))
        .register(PlayBin);
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio_util::sync::CancellationToken;

    use crate::media::bus;
    use crate::media::description::Params;
    use crate::media::element::ElementContext;
    use crate::media::props::StageProps;

    /// A detached element context plus the runtime backing its handle.
    pub(crate) fn context(name: &str, params: Params) -> (ElementContext, tokio::runtime::Runtime) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let (poster, _bus) = bus::channel();
        let ctx = ElementContext {
            name: name.to_string(),
            props: StageProps::detached(params),
            caps: None,
            cancel: CancellationToken::new(),
            handle: rt.handle().clone(),
            bus: poster,
        };
        (ctx, rt)
    }
}
