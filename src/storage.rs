use crate::errors::StoreError;
use crate::models::{
    normalize_username, seed_categories, CategoryRecord, EmissionType, UserRecord, UserTable,
};
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

const CATEGORY_HEADER: [&str; 3] = ["Category", "Value", "Type"];
const USER_HEADER: [&str; 3] = ["username", "password", "recovery_key"];

/// The emissions workbook. Every call reads or rewrites the whole file.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the seed rows when the workbook is missing. Returns whether it
    /// had to.
    pub async fn ensure_seeded(&self) -> Result<bool, StoreError> {
        if file_exists(&self.path).await? {
            return Ok(false);
        }
        self.save(&seed_categories()).await?;
        info!("seeded category workbook at {}", self.path.display());
        Ok(true)
    }

    pub async fn load(&self) -> Result<Vec<CategoryRecord>, StoreError> {
        let bytes = read_existing(&self.path).await?;
        decode_workbook(&bytes).map_err(|reason| {
            error!("failed to parse category workbook: {reason}");
            StoreError::unavailable(&self.path, reason)
        })
    }

    pub async fn save(&self, records: &[CategoryRecord]) -> Result<(), StoreError> {
        let payload =
            encode_workbook(records).map_err(|err| StoreError::unavailable(&self.path, err))?;
        write_atomic(&self.path, &payload)
            .await
            .map_err(|err| StoreError::unavailable(&self.path, err))
    }

    /// Overwrites the value of `category`, keeping its type. An unknown
    /// category leaves the file untouched.
    pub async fn update(&self, category: &str, value: f64) -> Result<CategoryRecord, StoreError> {
        let mut records = self.load().await?;
        let mut updated = None;
        for record in records.iter_mut().filter(|record| record.category == category) {
            record.value = value;
            updated.get_or_insert_with(|| record.clone());
        }

        let Some(updated) = updated else {
            return Err(StoreError::CategoryNotFound(category.to_string()));
        };

        self.save(&records).await?;
        Ok(updated)
    }

    /// Raw workbook bytes, for download.
    pub async fn export(&self) -> Result<Vec<u8>, StoreError> {
        read_existing(&self.path).await
    }
}

/// The plain-text credential file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure_initialized(&self) -> Result<bool, StoreError> {
        if file_exists(&self.path).await? {
            return Ok(false);
        }
        self.save(&[]).await?;
        info!("created credential file at {}", self.path.display());
        Ok(true)
    }

    pub async fn load(&self) -> Result<UserTable, StoreError> {
        let bytes = read_existing(&self.path).await?;
        decode_users(&bytes).map(UserTable::new).map_err(|reason| {
            error!("failed to parse credential file: {reason}");
            StoreError::unavailable(&self.path, reason)
        })
    }

    pub async fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let payload = encode_users(users).map_err(|err| StoreError::unavailable(&self.path, err))?;
        write_atomic(&self.path, &payload)
            .await
            .map_err(|err| StoreError::unavailable(&self.path, err))
    }

    /// Appends a new account. The existence check and the write are not
    /// guarded against a second writer doing the same thing.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        recovery_key: Option<&str>,
    ) -> Result<UserRecord, StoreError> {
        let username = normalize_username(username);
        let mut table = self.load().await?;
        if table.exists(&username) {
            return Err(StoreError::AlreadyExists(username));
        }

        let record = UserRecord {
            username,
            password: password.to_string(),
            recovery_key: recovery_key
                .filter(|key| !key.is_empty())
                .map(str::to_string),
        };
        table.users.push(record.clone());
        self.save(&table.users).await?;
        Ok(record)
    }
}

async fn file_exists(path: &Path) -> Result<bool, StoreError> {
    fs::try_exists(path)
        .await
        .map_err(|err| StoreError::unavailable(path, err))
}

async fn read_existing(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).await.map_err(|err| {
        error!("failed to read {}: {err}", path.display());
        StoreError::unavailable(path, err)
    })
}

/// Replaces `path` by writing a sibling temp file and renaming it over the
/// target, so readers see either the old or the new file. Each write gets its
/// own temp file; concurrent writers race on the rename and the last one wins.
async fn write_atomic(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, payload).await?;
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

fn encode_workbook(records: &[CategoryRecord]) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, title) in CATEGORY_HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title)?;
    }
    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, record.category.as_str())?;
        worksheet.write_number(row, 1, record.value)?;
        worksheet.write_string(row, 2, record.kind.as_str())?;
    }

    workbook.save_to_buffer()
}

fn decode_workbook(bytes: &[u8]) -> Result<Vec<CategoryRecord>, String> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|err| err.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or("workbook has no sheets")?
        .map_err(|err| err.to_string())?;

    let mut rows = range.rows();
    let header = rows.next().ok_or("missing header row")?;
    let columns = header_columns(header)?;

    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let line = index + 2;
        let category = cell_text(row.get(columns[0]))
            .ok_or_else(|| format!("row {line}: missing Category"))?;
        let value = cell_number(row.get(columns[1]))
            .ok_or_else(|| format!("row {line}: Value is not a number"))?;
        let kind = cell_text(row.get(columns[2]))
            .and_then(|text| EmissionType::parse(&text))
            .ok_or_else(|| format!("row {line}: Type must be Direct or Indirect"))?;
        records.push(CategoryRecord::new(category, value, kind));
    }

    Ok(records)
}

fn header_columns(header: &[Data]) -> Result<[usize; 3], String> {
    let mut columns = [0usize; 3];
    for (slot, title) in columns.iter_mut().zip(CATEGORY_HEADER) {
        *slot = header
            .iter()
            .position(|cell| matches!(cell, Data::String(text) if text.trim() == title))
            .ok_or_else(|| format!("missing {title} column"))?;
    }
    Ok(columns)
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Data::Float(value) => Some(value.to_string()),
        Data::Int(value) => Some(value.to_string()),
        _ => None,
    }
}

fn cell_number(cell: Option<&Data>) -> Option<f64> {
    let value = match cell? {
        Data::Float(value) => *value,
        Data::Int(value) => *value as f64,
        Data::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn encode_users(users: &[UserRecord]) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(USER_HEADER)
        .map_err(|err| err.to_string())?;
    for user in users {
        writer.serialize(user).map_err(|err| err.to_string())?;
    }
    writer.into_inner().map_err(|err| err.to_string())
}

fn decode_users(bytes: &[u8]) -> Result<Vec<UserRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let mut users = Vec::new();
    for record in reader.deserialize::<UserRecord>() {
        users.push(record.map_err(|err| err.to_string())?);
    }
    Ok(users)
}
