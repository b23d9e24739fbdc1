//! Background cover-art loader.
//!
//! Requests are queued to a single worker thread and answered on the event
//! bus, one `CoverArtMessage::ArtLoaded` per issued token.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use image::DynamicImage;
use lofty::file::TaggedFileExt;
use lofty::read_from_path;
use log::{debug, info, warn};
use tokio::sync::broadcast::Sender;

use crate::image_pipeline::{
    decode_image_from_memory_with_fallback, decode_image_from_path_with_fallback,
    downscale_to_max_edge,
};
use crate::protocol::{CoverArtMessage, CoverArtToken, CoverImage, Message, Song};

const SIDECAR_STEMS: [&str; 3] = ["cover", "folder", "front"];
const SIDECAR_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Issues asynchronous cover-art requests.
pub trait CoverArtProvider {
    /// Queues a load for `song` and returns immediately.
    fn request_async(&self, song: &Song) -> CoverArtToken;
}

struct CoverArtJob {
    token: CoverArtToken,
    song: Song,
}

/// Handle to the cover-art worker thread.
pub struct CoverArtLoader {
    next_token: AtomicU64,
    job_sender: mpsc::Sender<CoverArtJob>,
    default_image: Arc<Mutex<Option<CoverImage>>>,
}

impl CoverArtLoader {
    /// Spawns the worker; results are published on `bus_producer` with their
    /// long edge capped at `max_edge_px`.
    pub fn start(bus_producer: Sender<Message>, max_edge_px: u32) -> Self {
        let (job_sender, job_receiver) = mpsc::channel::<CoverArtJob>();
        let default_image = Arc::new(Mutex::new(None));
        let worker_default_image = Arc::clone(&default_image);
        let max_edge_px = max_edge_px.max(1);
        let spawn_result = thread::Builder::new()
            .name("cover-art-loader".to_string())
            .spawn(move || {
                Self::run_worker(job_receiver, bus_producer, max_edge_px, worker_default_image)
            });
        if let Err(err) = spawn_result {
            warn!("CoverArtLoader: failed to spawn worker thread: {}", err);
        }

        Self {
            next_token: AtomicU64::new(1),
            job_sender,
            default_image,
        }
    }

    /// Image delivered when a song has no art of its own.
    pub fn set_default_output_image(&self, image: Option<DynamicImage>) {
        let image = image.map(Arc::new);
        match self.default_image.lock() {
            Ok(mut default_image) => *default_image = image,
            Err(poisoned) => *poisoned.into_inner() = image,
        }
    }

    fn default_image_snapshot(default_image: &Mutex<Option<CoverImage>>) -> Option<CoverImage> {
        match default_image.lock() {
            Ok(default_image) => default_image.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn run_worker(
        job_receiver: mpsc::Receiver<CoverArtJob>,
        bus_producer: Sender<Message>,
        max_edge_px: u32,
        default_image: Arc<Mutex<Option<CoverImage>>>,
    ) {
        info!("CoverArtLoader: started");
        while let Ok(job) = job_receiver.recv() {
            let loaded = Self::load_cover(&job.song, max_edge_px);

            let image = match loaded {
                Some((cover_path, image)) => {
                    if let Some(path) = cover_path {
                        let _ = bus_producer.send(Message::CoverArt(
                            CoverArtMessage::CoverArtPathReady {
                                song: job.song.clone(),
                                path,
                            },
                        ));
                    }
                    Some(Arc::new(image))
                }
                None => {
                    debug!(
                        "CoverArtLoader: no cover art for '{}', token={}",
                        job.song.pretty_title(),
                        job.token
                    );
                    Self::default_image_snapshot(&default_image)
                }
            };

            if bus_producer
                .send(Message::CoverArt(CoverArtMessage::ArtLoaded {
                    token: job.token,
                    image,
                }))
                .is_err()
            {
                debug!(
                    "CoverArtLoader: no bus subscribers for token {}",
                    job.token
                );
            }
        }
        info!("CoverArtLoader: stopped");
    }

    /// Looks for art in the song's explicit art file, then the media file's
    /// tags, then a sidecar image. The path is returned for file-based art.
    fn load_cover(song: &Song, max_edge_px: u32) -> Option<(Option<PathBuf>, DynamicImage)> {
        if let Some(art_path) = song.art_path.as_ref().filter(|path| path.is_file()) {
            match decode_image_from_path_with_fallback(art_path) {
                Some(image) => {
                    return Some((
                        Some(art_path.clone()),
                        downscale_to_max_edge(image, max_edge_px),
                    ));
                }
                None => warn!(
                    "CoverArtLoader: failed to decode cover art {}",
                    art_path.display()
                ),
            }
        }

        let media_path = song.path.as_deref()?;
        if let Some(image) = read_embedded_cover_art(media_path)
            .and_then(|bytes| decode_image_from_memory_with_fallback(&bytes))
        {
            return Some((None, downscale_to_max_edge(image, max_edge_px)));
        }

        let sidecar_path = find_sidecar_cover(media_path.parent()?)?;
        match decode_image_from_path_with_fallback(&sidecar_path) {
            Some(image) => Some((Some(sidecar_path), downscale_to_max_edge(image, max_edge_px))),
            None => {
                warn!(
                    "CoverArtLoader: failed to decode cover art {}",
                    sidecar_path.display()
                );
                None
            }
        }
    }
}

impl CoverArtProvider for CoverArtLoader {
    fn request_async(&self, song: &Song) -> CoverArtToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let job = CoverArtJob {
            token,
            song: song.clone(),
        };
        if self.job_sender.send(job).is_err() {
            warn!(
                "CoverArtLoader: worker is gone, request {} will never resolve",
                token
            );
        }
        token
    }
}

/// Reads embedded cover-art bytes from a media file, if present.
fn read_embedded_cover_art(path: &Path) -> Option<Vec<u8>> {
    let tagged_file = read_from_path(path).ok()?;

    if let Some(tag) = tagged_file.primary_tag() {
        if let Some(picture) = tag.pictures().first() {
            return Some(picture.data().to_vec());
        }
    }

    for tag in tagged_file.tags() {
        if let Some(picture) = tag.pictures().first() {
            return Some(picture.data().to_vec());
        }
    }

    None
}

/// Finds `cover.jpg`, `folder.png`, ... next to the media file.
fn find_sidecar_cover(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_ascii_lowercase);
            let extension = path
                .extension()
                .and_then(|extension| extension.to_str())
                .map(str::to_ascii_lowercase);
            matches!(
                (stem, extension),
                (Some(stem), Some(extension))
                    if SIDECAR_STEMS.contains(&stem.as_str())
                        && SIDECAR_EXTENSIONS.contains(&extension.as_str())
            )
        })
        .collect();
    candidates.sort_by_key(|path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_ascii_lowercase)
            .and_then(|stem| SIDECAR_STEMS.iter().position(|known| *known == stem))
            .unwrap_or(SIDECAR_STEMS.len())
    });
    candidates.into_iter().next()
}
