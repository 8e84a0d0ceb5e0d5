//! Bulk import of sweet profiles from per-location folders of text files and
//! photos.

pub mod entries;
pub mod matcher;
pub mod ocr;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use chrono::Utc;
use db::models::{
    location::Location,
    sweet::{Sweet, UpsertSweet},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use self::{
    entries::{ProfileEntry, SweetField, parse_entries, safe_slug},
    matcher::{is_image, select_image},
    ocr::ImageTextReader,
};

/// Folder names of the seeded locations and their slugs.
const KNOWN_LOCATIONS: [(&str, &str); 6] = [
    ("台北", "taipei"),
    ("新北", "newtaipei"),
    ("桃園", "taoyuan"),
    ("台中", "taichung"),
    ("台南", "tainan"),
    ("高雄", "kaohsiung"),
];

const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source directory {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ImportError + '_ {
    move |source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub source_dir: PathBuf,
    /// Matched photos are copied under `<public_dir>/<location slug>/`.
    pub public_dir: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// `<location>-<name>` of every processed profile.
    pub imported: Vec<String>,
    /// Profiles left without a photo.
    pub unmatched: Vec<String>,
    pub skipped_locations: Vec<String>,
}

pub struct SweetImporter<'a> {
    pool: &'a SqlitePool,
    ocr: Option<&'a dyn ImageTextReader>,
}

/// Slug and display name for a location folder.
pub fn location_for_folder(folder: &str) -> (String, String) {
    let name = folder.trim();
    match KNOWN_LOCATIONS.iter().find(|(known, _)| *known == name) {
        Some((known, slug)) => (slug.to_string(), known.to_string()),
        None => (safe_slug(name), name.to_string()),
    }
}

impl<'a> SweetImporter<'a> {
    pub fn new(pool: &'a SqlitePool, ocr: Option<&'a dyn ImageTextReader>) -> Self {
        Self { pool, ocr }
    }

    pub async fn run(&self, options: &ImportOptions) -> Result<ImportReport, ImportError> {
        if !fs::try_exists(&options.source_dir)
            .await
            .map_err(io_error(&options.source_dir))?
        {
            return Err(ImportError::SourceMissing(options.source_dir.clone()));
        }

        let location_dirs = list_dir(&options.source_dir, |_, is_dir| is_dir).await?;
        let total = location_dirs.len();
        let mut report = ImportReport::default();

        for (index, location_dir) in location_dirs.iter().enumerate() {
            let folder = location_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!(location = %folder, "Importing location ({}/{})", index + 1, total);
            self.import_location(location_dir, &folder, options, &mut report)
                .await?;
        }

        if !report.unmatched.is_empty() {
            warn!(profiles = %report.unmatched.join(", "), "Profiles without a photo");
        }
        info!(
            imported = report.imported.len(),
            dry_run = options.dry_run,
            "Processed sweet profiles"
        );
        Ok(report)
    }

    async fn import_location(
        &self,
        location_dir: &Path,
        folder: &str,
        options: &ImportOptions,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let (slug, display_name) = location_for_folder(folder);

        let text_files = list_dir(location_dir, |path, is_dir| {
            !is_dir && path.extension().is_some_and(|ext| ext == "txt")
        })
        .await?;
        if text_files.is_empty() {
            warn!(location = %folder, "No text files, skipping");
            report.skipped_locations.push(display_name);
            return Ok(());
        }

        let mut contents = Vec::with_capacity(text_files.len());
        for file in &text_files {
            contents.push(fs::read_to_string(file).await.map_err(io_error(file))?);
        }
        let entries = parse_entries(&contents.join("\n\n"));
        if entries.is_empty() {
            warn!(location = %folder, "No profiles found in text files, skipping");
            report.skipped_locations.push(display_name);
            return Ok(());
        }

        let location_id = if options.dry_run {
            Location::find_by_slug(self.pool, &slug).await?.map(|l| l.id)
        } else {
            let (location, created) =
                Location::find_or_create(self.pool, &slug, &display_name).await?;
            if created {
                info!(slug = %slug, "Created location");
            }
            Some(location.id)
        };

        let mut queue = list_dir(location_dir, |path, is_dir| !is_dir && is_image(path)).await?;
        let public_dir = options.public_dir.join(&slug);
        if !options.dry_run {
            fs::create_dir_all(&public_dir)
                .await
                .map_err(io_error(&public_dir))?;
        }

        let mut used_names = HashSet::new();
        for entry in &entries {
            let image_url = match select_image(&entry.name, &mut queue, self.ocr).await {
                Some(image) => {
                    let file_name = unique_file_name(
                        &safe_slug(&entry.name),
                        &image_extension(&image),
                        &mut used_names,
                    );
                    if !options.dry_run {
                        let dest = public_dir.join(&file_name);
                        fs::copy(&image, &dest).await.map_err(io_error(&image))?;
                    }
                    info!(location = %display_name, name = %entry.name, file = %file_name, "Photo matched");
                    format!("/sweets/{slug}/{file_name}")
                }
                None => {
                    warn!(location = %display_name, name = %entry.name, "No photo left for profile");
                    report.unmatched.push(entry.name.clone());
                    String::new()
                }
            };

            let data = to_upsert(entry, location_id, &display_name, image_url);
            if options.dry_run {
                info!(
                    location = %display_name,
                    name = %entry.name,
                    image = %data.image_url,
                    long_price = ?data.long_price,
                    short_price = ?data.short_price,
                    "Dry run, not saved"
                );
            } else {
                let (sweet, created) = Sweet::upsert_by_name_and_location(self.pool, &data).await?;
                info!(sweet_id = sweet.id, created, name = %sweet.name, "Saved sweet");
            }
            report.imported.push(format!("{}-{}", display_name, entry.name));
        }
        Ok(())
    }
}

fn to_upsert(
    entry: &ProfileEntry,
    location_id: Option<i64>,
    location_name: &str,
    image_url: String,
) -> UpsertSweet {
    let service_type = entry.field(SweetField::ServiceType).to_string();
    let tag = [location_name, service_type.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    UpsertSweet {
        name: entry.name.clone(),
        location_id,
        description: entry.description.clone(),
        image_url,
        tag,
        environment: entry.field(SweetField::Environment).to_string(),
        service_type,
        long_duration_minutes: entry.int_field(SweetField::LongDuration),
        short_duration_minutes: entry.int_field(SweetField::ShortDuration),
        long_price: entry.int_field(SweetField::LongPrice),
        short_price: entry.int_field(SweetField::ShortPrice),
        update_time: Some(Utc::now()),
    }
}

/// `<stem><ext>`, or `<stem>-<n><ext>` when names in the same location
/// transliterate to the same stem.
fn unique_file_name(stem: &str, extension: &str, used: &mut HashSet<String>) -> String {
    let mut file_name = format!("{stem}{extension}");
    let mut counter = 2;
    while !used.insert(file_name.clone()) {
        file_name = format!("{stem}-{counter}{extension}");
        counter += 1;
    }
    file_name
}

fn image_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

/// Sorted entries of `dir` accepted by `keep(path, is_dir)`.
async fn list_dir<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>, ImportError>
where
    F: Fn(&Path, bool) -> bool,
{
    let mut reader = fs::read_dir(dir).await.map_err(io_error(dir))?;
    let mut paths = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .await
            .map_err(io_error(&path))?
            .is_dir();
        if keep(&path, is_dir) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
