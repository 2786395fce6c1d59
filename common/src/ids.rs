use crate::entity::EntityKind;

/// Siguiente id numérico para un tipo de entidad: `max(existentes) + 1`,
/// o `1` si todavía no hay ninguno.
pub fn next_id<I>(existing: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    existing.into_iter().max().map_or(1, |max| max + 1)
}

/// Id público: prefijo del tipo + número, ej. "d3", "m1", "t12".
pub fn format_id(kind: EntityKind, num: u32) -> String {
    format!("{}{}", kind.prefix(), num)
}
