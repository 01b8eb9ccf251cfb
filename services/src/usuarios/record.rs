//! Conversion between MongoDB documents and [`Usuario`].
//!
//! This is the only place that knows the stored field names, so schema
//! drift is tracked here and nowhere else.

use super::model::{StoredUsuario, Usuario};
use mongodb::bson::{Bson, Document, doc};

pub const ID_FIELD: &str = "_id";
pub const CEDULA_FIELD: &str = "cedula";

/// A stored document that does not fit the `Usuario` schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has unexpected type {found}")]
    UnexpectedType {
        field: &'static str,
        found: String,
    },
}

/// Filter selecting the record with the given business key.
pub fn cedula_filter(cedula: &str) -> Document {
    doc! { "cedula": cedula }
}

/// Full document for insertion. `_id` is left to the database.
pub fn to_document(usuario: &Usuario) -> Document {
    let mut document = doc! { "cedula": usuario.cedula.as_str() };
    for (key, value) in replacement_fields(usuario) {
        document.insert(key, value);
    }
    document
}

/// Every field except the business key, for a full-overwrite update.
///
/// `banco` is always written, so an omitted bank clears the stored one.
pub fn replacement_fields(usuario: &Usuario) -> Document {
    doc! {
        "nombre": usuario.nombre.as_str(),
        "salario": usuario.salario,
        "fecha_nacimiento": usuario.fecha_nacimiento.as_str(),
        "fecha_ingreso": usuario.fecha_ingreso.as_str(),
        "cargo": usuario.cargo.as_str(),
        "banco": usuario.banco.as_deref().map_or(Bson::Null, |banco| Bson::String(banco.to_owned())),
    }
}

/// Reads a stored document back into a typed record.
pub fn from_document(document: &Document) -> Result<StoredUsuario, RecordError> {
    let id = match document.get(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => return Err(RecordError::MissingField(ID_FIELD)),
    };

    let usuario = Usuario {
        cedula: string_field(document, CEDULA_FIELD)?,
        nombre: string_field(document, "nombre")?,
        salario: number_field(document, "salario")?,
        fecha_nacimiento: string_field(document, "fecha_nacimiento")?,
        fecha_ingreso: string_field(document, "fecha_ingreso")?,
        cargo: string_field(document, "cargo")?,
        banco: optional_string_field(document, "banco")?,
    };

    Ok(StoredUsuario { id, usuario })
}

fn string_field(document: &Document, field: &'static str) -> Result<String, RecordError> {
    match document.get(field) {
        Some(Bson::String(value)) => Ok(value.clone()),
        Some(other) => Err(unexpected(field, other)),
        None => Err(RecordError::MissingField(field)),
    }
}

fn optional_string_field(
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, RecordError> {
    match document.get(field) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(unexpected(field, other)),
    }
}

// Other writers may have stored whole salaries as integers.
fn number_field(document: &Document, field: &'static str) -> Result<f64, RecordError> {
    match document.get(field) {
        Some(Bson::Double(value)) => Ok(*value),
        Some(Bson::Int32(value)) => Ok(f64::from(*value)),
        Some(Bson::Int64(value)) => Ok(*value as f64),
        Some(other) => Err(unexpected(field, other)),
        None => Err(RecordError::MissingField(field)),
    }
}

fn unexpected(field: &'static str, value: &Bson) -> RecordError {
    RecordError::UnexpectedType {
        field,
        found: format!("{:?}", value.element_type()),
    }
}
