use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};

use log::{error, info};
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Connection, ToSql,
};

use crate::schema::{CountryName, Percentage, Record};

const CREATE_TABLE: &str = "CREATE TABLE Database (
    ID INTEGER PRIMARY KEY,
    Country STRING NOT NULL,
    CO2World2017 FLOAT NOT NULL
);";
const DROP_TABLE: &str = "DROP TABLE IF EXISTS Database;";
const INSERT_ROW: &str = "INSERT INTO Database (ID, Country, CO2World2017) VALUES (?1, ?2, ?3)";
const SELECT_ROWS: &str = "SELECT Country, CO2World2017 FROM Database ORDER BY ID";

/// Where the emissions table is kept and whether it outlives the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Persistence {
    /// In-memory database; nothing touches the disk.
    #[default]
    Transient,
    /// File database that is deleted once the run is over.
    Scratch(PathBuf),
    /// File database that is kept; the table is recreated on every run.
    Keep(PathBuf),
}
impl Persistence {
    pub fn location(&self) -> StoreLocation {
        match self {
            Self::Transient => StoreLocation::InMemory,
            Self::Scratch(path) | Self::Keep(path) => StoreLocation::File(path.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreLocation {
    InMemory,
    File(PathBuf),
}
impl Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory database"),
            Self::File(path) => write!(f, "database {path:?}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open {location}: {source}")]
    Open {
        location: StoreLocation,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Error while connecting to SQLite: {0}")]
    Connect(#[source] rusqlite::Error),
    #[error("Error while creating the emissions table: {0}")]
    CreateTable(#[source] rusqlite::Error),
    #[error("Failed to insert row {id} ({country}): {source}")]
    Insert {
        id: i64,
        country: CountryName,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),
    #[error("Failed to read from the emissions table: {0}")]
    Read(#[source] rusqlite::Error),
    #[error("Error while closing the connection: {0}")]
    Close(#[source] rusqlite::Error),
    #[error("Failed to delete the database file: {0}")]
    Delete(#[source] io::Error),
}

/// Logs a store error where it happens, then hands it back to the caller.
fn logged<T>(result: Result<T, StoreError>) -> Result<T, StoreError> {
    result.inspect_err(|e| error!("{e}"))
}

/// The SQLite table holding one row per [`Record`].
pub struct EmissionsStore {
    conn: Connection,
    location: StoreLocation,
}

impl EmissionsStore {
    /// Opens the database, creating the file if it does not exist yet.
    pub fn open(location: StoreLocation) -> Result<Self, StoreError> {
        let conn = match &location {
            StoreLocation::InMemory => Connection::open_in_memory(),
            StoreLocation::File(path) => Connection::open(path),
        };
        let conn = logged(conn.map_err(|source| StoreError::Open {
            location: location.clone(),
            source,
        }))?;
        Ok(Self { conn, location })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn sqlite_version(&self) -> Result<String, StoreError> {
        logged(
            self.conn
                .query_row("select sqlite_version();", [], |row| row.get(0))
                .map_err(StoreError::Connect),
        )
    }

    /// Checks that the connection is usable and reports the SQLite version.
    pub fn connect(&self) -> Result<(), StoreError> {
        let version = self.sqlite_version()?;
        info!("Connected to {} (SQLite {version})", self.location);
        Ok(())
    }

    /// Fails if the table already exists.
    pub fn create_table(&self) -> Result<(), StoreError> {
        logged(
            self.conn
                .execute_batch(CREATE_TABLE)
                .map_err(StoreError::CreateTable),
        )?;
        info!("SQLite table created");
        Ok(())
    }

    pub fn reset_table(&self) -> Result<(), StoreError> {
        logged(
            self.conn
                .execute_batch(DROP_TABLE)
                .map_err(StoreError::CreateTable),
        )?;
        self.create_table()
    }

    pub fn insert(&self, id: i64, record: &Record) -> Result<(), StoreError> {
        logged(insert_row(&self.conn, id, record))
    }

    /// Inserts every record in a single transaction, numbering rows from 1.
    pub fn insert_all(&mut self, records: &[Record]) -> Result<usize, StoreError> {
        let tx = logged(self.conn.transaction().map_err(StoreError::Transaction))?;
        for (id, record) in (1..).zip(records) {
            logged(insert_row(&tx, id, record))?;
        }
        logged(tx.commit().map_err(StoreError::Transaction))?;
        info!("Inserted {} row(s)", records.len());
        Ok(records.len())
    }

    /// Reads every row back, in insertion (ID) order.
    pub fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        let read = || -> rusqlite::Result<Vec<Record>> {
            let mut statement = self.conn.prepare(SELECT_ROWS)?;
            let rows = statement.query_map([], |row| Ok(Record::new(row.get(0)?, row.get(1)?)))?;
            rows.collect()
        };
        logged(read().map_err(StoreError::Read))
    }

    pub fn close(self) -> Result<(), StoreError> {
        logged(self.conn.close().map_err(|(_, e)| StoreError::Close(e)))?;
        info!("The SQLite connection is closed");
        Ok(())
    }
}

fn insert_row(conn: &Connection, id: i64, record: &Record) -> Result<(), StoreError> {
    conn.execute(
        INSERT_ROW,
        params![id, record.country(), record.percentage()],
    )
    .map_err(|source| StoreError::Insert {
        id,
        country: record.country().clone(),
        source,
    })?;
    Ok(())
}

/// Removes the database file. Returns whether there was a file to remove.
pub fn delete_database(path: &Path) -> Result<bool, StoreError> {
    match fs_err::remove_file(path) {
        Ok(()) => {
            info!("Deleted database {path:?}");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => logged(Err(StoreError::Delete(e))),
    }
}

impl ToSql for CountryName {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}
impl FromSql for CountryName {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        // `STRING` columns have numeric affinity, so numeric-looking names come back as numbers.
        match value {
            ValueRef::Integer(i) => Ok(i.to_string().into()),
            ValueRef::Real(f) => Ok(f.to_string().into()),
            _ => String::column_result(value).map(Self::from),
        }
    }
}

impl ToSql for Percentage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}
impl FromSql for Percentage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Percentage::try_from(f64::column_result(value)?)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
