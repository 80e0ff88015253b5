//! Cover image files and the collage built from them.
//!
//! # Responsibility
//! - Store uploaded covers under `<static_dir>/covers` with generated names.
//! - Rebuild `<static_dir>/collage.jpg` from the covers the catalogue references.
//!
//! # Invariants
//! - Stored names are `<uuid>.<ext>` with a lowercase accepted extension.
//! - The collage is replaced atomically through a rename.

use bookshelf_core::Book;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageError, Rgb, RgbImage};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// URL prefix the static directory is mounted under.
pub const STATIC_URL: &str = "/static";
/// Request body cap for add/edit submissions carrying a cover.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

const COVERS_DIR: &str = "covers";
const COLLAGE_FILE: &str = "collage.jpg";
const TILE_WIDTH: u32 = 220;
const TILE_HEIGHT: u32 = 320;
const COLLAGE_QUALITY: u8 = 85;

#[derive(Debug)]
pub enum CoverError {
    /// Upload name has no accepted image extension.
    UnsupportedType,
    Io(io::Error),
    Image(ImageError),
}

impl Display for CoverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType => write!(
                f,
                "cover must be a .jpg, .jpeg, .png, .webp or .gif image"
            ),
            Self::Io(err) => write!(f, "cover file error: {err}"),
            Self::Image(err) => write!(f, "cover image error: {err}"),
        }
    }
}

impl Error for CoverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnsupportedType => None,
            Self::Io(err) => Some(err),
            Self::Image(err) => Some(err),
        }
    }
}

impl From<io::Error> for CoverError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ImageError> for CoverError {
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

/// On-disk home of cover files, served under `STATIC_URL`.
#[derive(Debug, Clone)]
pub struct CoverStore {
    static_dir: PathBuf,
}

impl CoverStore {
    /// Uses `static_dir`, creating it and its `covers/` subdirectory if needed.
    pub fn open(static_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let static_dir = static_dir.into();
        fs::create_dir_all(static_dir.join(COVERS_DIR))?;
        Ok(Self { static_dir })
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn cover_path(&self, filename: &str) -> PathBuf {
        self.static_dir.join(COVERS_DIR).join(filename)
    }

    pub fn collage_path(&self) -> PathBuf {
        self.static_dir.join(COLLAGE_FILE)
    }

    pub fn has_collage(&self) -> bool {
        self.collage_path().is_file()
    }

    /// Writes an upload under a fresh name and returns that name.
    pub fn save(&self, upload_name: &str, bytes: &[u8]) -> Result<String, CoverError> {
        let extension = accepted_extension(upload_name).ok_or(CoverError::UnsupportedType)?;
        let filename = format!("{}.{extension}", Uuid::new_v4().simple());
        fs::write(self.cover_path(&filename), bytes)?;
        info!(
            "event=cover_save module=covers status=ok bytes={}",
            bytes.len()
        );
        Ok(filename)
    }

    /// Deletes a stored cover. A file that is already gone is not an error.
    pub fn remove(&self, filename: &str) {
        match fs::remove_file(self.cover_path(filename)) {
            Ok(()) => info!("event=cover_remove module=covers status=ok"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("event=cover_remove module=covers status=error error={err}"),
        }
    }

    /// Tiles every referenced cover into the collage and returns the tile count.
    ///
    /// Unreadable covers are skipped. With no covers at all the collage file
    /// is removed.
    pub fn rebuild_collage(&self, books: &[Book]) -> Result<u32, CoverError> {
        let covers: Vec<PathBuf> = books
            .iter()
            .filter_map(|book| book.cover_filename.as_deref())
            .map(|filename| self.cover_path(filename))
            .collect();

        if covers.is_empty() {
            match fs::remove_file(self.collage_path()) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            return Ok(0);
        }

        let (columns, rows) = collage_grid(covers.len());
        let mut canvas = RgbImage::from_pixel(
            columns * TILE_WIDTH,
            rows * TILE_HEIGHT,
            Rgb([255, 255, 255]),
        );

        let mut placed = 0_u32;
        for path in &covers {
            let tile = match image::open(path) {
                Ok(image) => image
                    .resize_exact(TILE_WIDTH, TILE_HEIGHT, FilterType::Triangle)
                    .to_rgb8(),
                Err(err) => {
                    warn!("event=collage_tile module=covers status=skipped error={err}");
                    continue;
                }
            };
            let x = (placed % columns) * TILE_WIDTH;
            let y = (placed / columns) * TILE_HEIGHT;
            imageops::replace(&mut canvas, &tile, i64::from(x), i64::from(y));
            placed += 1;
        }

        let staging = self
            .static_dir
            .join(format!(".{}.collage.tmp", Uuid::new_v4().simple()));
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            JpegEncoder::new_with_quality(&mut writer, COLLAGE_QUALITY).encode_image(&canvas)?;
            writer.flush()?;
        }
        fs::rename(&staging, self.collage_path())?;
        Ok(placed)
    }
}

/// Lowercased extension of `name` when it is an accepted image type.
fn accepted_extension(name: &str) -> Option<String> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Between three and eight columns, growing with the cover count.
fn collage_grid(count: usize) -> (u32, u32) {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let columns = ((f64::from(count).sqrt() * 2.0) as u32).clamp(3, 8);
    (columns, count.div_ceil(columns))
}

#[cfg(test)]
mod tests {
    use super::{accepted_extension, collage_grid, CoverError, CoverStore};
    use bookshelf_core::{Book, BookDraft};
    use image::{Rgb, RgbImage};

    fn book_with_cover(filename: &str) -> Book {
        Book::from_draft(&BookDraft {
            cover_filename: Some(filename.to_string()),
            ..BookDraft::new("Title", "Author")
        })
        .unwrap()
    }

    #[test]
    fn extensions_are_matched_case_insensitively() {
        assert_eq!(accepted_extension("Dune.JPG").as_deref(), Some("jpg"));
        assert_eq!(accepted_extension("cover.webp").as_deref(), Some("webp"));
        assert_eq!(accepted_extension("notes.txt"), None);
        assert_eq!(accepted_extension("no_extension"), None);
    }

    #[test]
    fn grid_keeps_between_three_and_eight_columns() {
        assert_eq!(collage_grid(1), (3, 1));
        assert_eq!(collage_grid(4), (4, 1));
        assert_eq!(collage_grid(9), (6, 2));
        assert_eq!(collage_grid(100), (8, 13));
    }

    #[test]
    fn save_uses_generated_name_and_rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoverStore::open(dir.path()).unwrap();

        let saved = store.save("My Cover.PNG", b"png-bytes").unwrap();
        assert!(saved.ends_with(".png"));
        assert_ne!(saved, "My Cover.PNG");
        assert_eq!(std::fs::read(store.cover_path(&saved)).unwrap(), b"png-bytes");

        assert!(matches!(
            store.save("script.sh", b"#!/bin/sh"),
            Err(CoverError::UnsupportedType)
        ));
    }

    #[test]
    fn collage_tiles_readable_covers_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoverStore::open(dir.path()).unwrap();

        RgbImage::from_pixel(40, 60, Rgb([220, 20, 20]))
            .save(store.cover_path("red.png"))
            .unwrap();
        RgbImage::from_pixel(40, 60, Rgb([20, 20, 220]))
            .save(store.cover_path("blue.png"))
            .unwrap();
        std::fs::write(store.cover_path("broken.png"), b"not an image").unwrap();

        let books = [
            book_with_cover("red.png"),
            book_with_cover("broken.png"),
            book_with_cover("blue.png"),
            Book::from_draft(&BookDraft::new("No cover", "Author")).unwrap(),
        ];
        assert_eq!(store.rebuild_collage(&books).unwrap(), 2);

        let collage = image::open(store.collage_path()).unwrap().to_rgb8();
        assert_eq!(collage.dimensions(), (660, 320));
        let first = collage.get_pixel(100, 150);
        assert!(first[0] > 180 && first[2] < 80, "unexpected pixel {first:?}");
        let second = collage.get_pixel(320, 150);
        assert!(second[2] > 180 && second[0] < 80, "unexpected pixel {second:?}");
    }

    #[test]
    fn collage_is_removed_when_no_book_has_a_cover() {
        let dir = tempfile::tempdir().unwrap();
        let store = CoverStore::open(dir.path()).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save(store.cover_path("only.png"))
            .unwrap();
        store.rebuild_collage(&[book_with_cover("only.png")]).unwrap();
        assert!(store.has_collage());

        let plain = Book::from_draft(&BookDraft::new("Plain", "Author")).unwrap();
        assert_eq!(store.rebuild_collage(&[plain]).unwrap(), 0);
        assert!(!store.has_collage());
    }
}
