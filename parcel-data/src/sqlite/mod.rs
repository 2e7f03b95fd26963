//! SQLite-backed polygon layer.
//!
//! Each layer is one table with an autoincrement `fid`, a `geometry` column
//! holding normalised WKT, and one nullable text column per attribute. A
//! layer created by [`SqlitePolygonLayer::create`] carries the `parcel`
//! attribute; layers created elsewhere may carry any text attributes.
//!
//! Edit sessions map onto `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK`, and each
//! batch runs inside a savepoint so a rejected batch leaves the session as it
//! was.

mod geometry;

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use parcel_core::{Feature, FeatureId, FeatureStore, FieldSchema, PARCEL_FIELD, StoreError};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, params, params_from_iter};
use thiserror::Error;

pub use geometry::GeometryError;

const FID_COLUMN: &str = "fid";
const GEOMETRY_COLUMN: &str = "geometry";

/// Errors raised by [`SqlitePolygonLayer`].
#[derive(Debug, Error)]
pub enum LayerError {
    /// Layer names are restricted to ASCII letters, digits and `_`.
    #[error("invalid layer name {name:?}; use ASCII letters, digits and '_'")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory for {path}: {source}")]
    CreateDirectory {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The database path could not be inspected.
    #[error("failed to access {path}: {source}")]
    Access {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The database file does not exist.
    #[error("database {path} does not exist")]
    MissingDatabase {
        /// Database path.
        path: Utf8PathBuf,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database has no table for the layer.
    #[error("there is no {layer:?} layer in {path}")]
    NotFound {
        /// Requested layer.
        layer: String,
        /// Database path.
        path: Utf8PathBuf,
    },
    /// The layer table lacks the geometry column.
    #[error("layer {layer:?} has no \"geometry\" column")]
    NotPolygonLayer {
        /// Offending layer.
        layer: String,
    },
    /// A write or session call arrived outside an edit session.
    #[error("no edit session is open")]
    NotEditing,
    /// An edit session is already open.
    #[error("an edit session is already open")]
    AlreadyEditing,
    /// The layer has no such attribute.
    #[error("layer has no attribute named {name:?}")]
    UnknownField {
        /// Requested attribute.
        name: String,
    },
    /// A feature of an added batch carried unusable geometry.
    #[error("feature {index} of the batch has invalid geometry: {source}")]
    Geometry {
        /// Position of the feature in the batch.
        index: usize,
        /// Why the geometry was rejected.
        #[source]
        source: GeometryError,
    },
    /// A statement failed.
    #[error("SQLite statement failed: {0}")]
    Sqlite(#[from] SqliteError),
}

/// A polygon layer stored in one SQLite table.
#[derive(Debug)]
pub struct SqlitePolygonLayer {
    connection: Connection,
    path: Utf8PathBuf,
    layer: String,
    schema: FieldSchema,
}

impl SqlitePolygonLayer {
    /// Create `layer` in the database at `path` if it is not there yet, then
    /// open it.
    ///
    /// The database file and its parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] when the name is invalid, the directory cannot
    /// be created, or the table cannot be created.
    pub fn create(path: &Utf8Path, layer: &str) -> Result<Self, LayerError> {
        validate_name(layer)?;
        parcel_fs::ensure_parent_dir(path).map_err(|source| LayerError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let connection = open_connection(path)?;
        connection.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{layer}\" (
                {FID_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT,
                {GEOMETRY_COLUMN} TEXT NOT NULL,
                \"{PARCEL_FIELD}\" TEXT
            );
            CREATE INDEX IF NOT EXISTS \"{layer}_{PARCEL_FIELD}_idx\"
                ON \"{layer}\" (\"{PARCEL_FIELD}\");"
        ))?;
        info!("layer {layer:?} ready in {path}");
        Self::from_connection(connection, path, layer)
    }

    /// Open an existing `layer` in the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::MissingDatabase`] when the file is absent and
    /// [`LayerError::NotFound`] when it holds no such table.
    pub fn open(path: &Utf8Path, layer: &str) -> Result<Self, LayerError> {
        validate_name(layer)?;
        let exists = parcel_fs::file_is_file(path).map_err(|source| LayerError::Access {
            path: path.to_path_buf(),
            source,
        })?;
        if !exists {
            return Err(LayerError::MissingDatabase {
                path: path.to_path_buf(),
            });
        }
        let connection = open_connection(path)?;
        Self::from_connection(connection, path, layer)
    }

    fn from_connection(
        connection: Connection,
        path: &Utf8Path,
        layer: &str,
    ) -> Result<Self, LayerError> {
        let found = connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![layer],
                |_| Ok(()),
            )
            .optional()?;
        if found.is_none() {
            return Err(LayerError::NotFound {
                layer: layer.to_owned(),
                path: path.to_path_buf(),
            });
        }

        let columns = {
            let mut statement = connection.prepare(&format!("PRAGMA table_info(\"{layer}\")"))?;
            let names = statement.query_map([], |row| row.get::<_, String>(1))?;
            names.collect::<Result<Vec<_>, _>>()?
        };
        if !columns.iter().any(|column| column == GEOMETRY_COLUMN) {
            return Err(LayerError::NotPolygonLayer {
                layer: layer.to_owned(),
            });
        }
        let schema = FieldSchema::new(
            columns
                .into_iter()
                .filter(|column| column != FID_COLUMN && column != GEOMETRY_COLUMN),
        );
        debug!("opened layer {layer:?} with fields {:?}", schema.names().collect::<Vec<_>>());

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            layer: layer.to_owned(),
            schema,
        })
    }

    /// Layer (table) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.layer
    }

    /// Database path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Number of features in the layer.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] when the count query fails.
    pub fn feature_count(&self) -> Result<usize, LayerError> {
        let count: i64 = self.connection.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", self.layer),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Stored WKT of feature `id`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] when the lookup fails.
    pub fn geometry_wkt(&self, id: FeatureId) -> Result<Option<String>, LayerError> {
        let wkt = self
            .connection
            .query_row(
                &format!(
                    "SELECT {GEOMETRY_COLUMN} FROM \"{}\" WHERE {FID_COLUMN} = ?1",
                    self.layer
                ),
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(wkt)
    }

    fn ensure_editing(&self) -> Result<(), LayerError> {
        if self.connection.is_autocommit() {
            return Err(LayerError::NotEditing);
        }
        Ok(())
    }

    fn scan_parcel_ids(&self) -> Result<Vec<Option<String>>, LayerError> {
        let column = if self.schema.contains(PARCEL_FIELD) {
            format!("\"{PARCEL_FIELD}\"")
        } else {
            "NULL".to_owned()
        };
        let mut statement = self.connection.prepare(&format!(
            "SELECT {column} FROM \"{}\" ORDER BY {FID_COLUMN}",
            self.layer
        ))?;
        let rows = statement.query_map([], |row| row.get::<_, Option<String>>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn select_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<FeatureId>, LayerError> {
        if !self.schema.contains(attribute) {
            return Err(LayerError::UnknownField {
                name: attribute.to_owned(),
            });
        }
        let mut statement = self.connection.prepare(&format!(
            "SELECT {FID_COLUMN} FROM \"{}\" WHERE \"{attribute}\" = ?1 ORDER BY {FID_COLUMN}",
            self.layer
        ))?;
        let rows = statement.query_map(params![value], |row| row.get::<_, i64>(0))?;
        Ok(rows.map(|fid| fid.map(FeatureId)).collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_batch(&mut self, features: &[Feature]) -> Result<Vec<FeatureId>, LayerError> {
        self.ensure_editing()?;
        let geometries = features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                geometry::normalise_polygon_wkt(feature.geometry_wkt())
                    .map_err(|source| LayerError::Geometry { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fields: Vec<&str> = self.schema.names().collect();
        let columns: String = fields.iter().map(|name| format!(", \"{name}\"")).collect();
        let placeholders: String = (2..=fields.len() + 1).map(|n| format!(", ?{n}")).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({GEOMETRY_COLUMN}{columns}) VALUES (?1{placeholders})",
            self.layer
        );

        let savepoint = self.connection.savepoint()?;
        let mut added = Vec::with_capacity(features.len());
        {
            let mut statement = savepoint.prepare(&sql)?;
            for (feature, wkt) in features.iter().zip(geometries) {
                let values = std::iter::once(Some(wkt)).chain(
                    fields
                        .iter()
                        .map(|name| feature.attribute(name).map(str::to_owned)),
                );
                statement.execute(params_from_iter(values))?;
                added.push(FeatureId(savepoint.last_insert_rowid()));
            }
        }
        savepoint.commit()?;
        Ok(added)
    }

    fn delete_batch(&mut self, ids: &[FeatureId]) -> Result<usize, LayerError> {
        self.ensure_editing()?;
        let unique: BTreeSet<FeatureId> = ids.iter().copied().collect();
        let savepoint = self.connection.savepoint()?;
        let mut deleted = 0;
        {
            let mut statement = savepoint.prepare(&format!(
                "DELETE FROM \"{}\" WHERE {FID_COLUMN} = ?1",
                self.layer
            ))?;
            for id in unique {
                deleted += statement.execute(params![id.0])?;
            }
        }
        savepoint.commit()?;
        Ok(deleted)
    }
}

fn validate_name(layer: &str) -> Result<(), LayerError> {
    let valid = !layer.is_empty()
        && layer
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(LayerError::InvalidName {
            name: layer.to_owned(),
        })
    }
}

fn open_connection(path: &Utf8Path) -> Result<Connection, LayerError> {
    Connection::open(path.as_std_path()).map_err(|source| LayerError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn store_error(operation: &'static str) -> impl FnOnce(LayerError) -> StoreError {
    move |err| StoreError::new(operation, err)
}

impl FeatureStore for SqlitePolygonLayer {
    fn fields(&self) -> &FieldSchema {
        &self.schema
    }

    fn feature_parcel_ids(&self) -> Result<Vec<Option<String>>, StoreError> {
        self.scan_parcel_ids().map_err(store_error("scan parcel ids"))
    }

    fn query_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<FeatureId>, StoreError> {
        self.select_by_attribute(attribute, value)
            .map_err(store_error("query features"))
    }

    fn begin_edit(&mut self) -> Result<(), StoreError> {
        let result = if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(LayerError::from)
        } else {
            Err(LayerError::AlreadyEditing)
        };
        result.map_err(store_error("begin edit session"))
    }

    fn add_features(&mut self, features: &[Feature]) -> Result<Vec<FeatureId>, StoreError> {
        self.insert_batch(features).map_err(store_error("add features"))
    }

    fn delete_features(&mut self, ids: &[FeatureId]) -> Result<usize, StoreError> {
        self.delete_batch(ids).map_err(store_error("delete features"))
    }

    fn commit_edit(&mut self) -> Result<(), StoreError> {
        self.ensure_editing()
            .and_then(|()| Ok(self.connection.execute_batch("COMMIT")?))
            .map_err(store_error("commit edit session"))
    }

    fn rollback_edit(&mut self) -> Result<(), StoreError> {
        self.ensure_editing()
            .and_then(|()| Ok(self.connection.execute_batch("ROLLBACK")?))
            .map_err(store_error("roll back edit session"))
    }
}

#[cfg(test)]
mod tests;
