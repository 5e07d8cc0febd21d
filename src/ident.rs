use std::collections::HashSet;

/// Folds the Spanish accented characters that show up in entity labels to
/// their ASCII base letter. Anything else non-ASCII is left for the
/// separator collapse below.
fn fold_ascii(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        other => other,
    }
}

fn collapse(value: &str, separator: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_separator = false;
    for ch in value.chars().flat_map(char::to_lowercase).map(fold_ascii) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(separator);
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Lower-cased identifier fragment for foreign-key column names: runs of
/// non-alphanumeric characters collapse to a single underscore, and a label
/// with nothing usable falls back to "relacion".
pub fn label_fragment(label: &str) -> String {
    let fragment = collapse(label, '_');
    if fragment.is_empty() {
        "relacion".to_string()
    } else {
        fragment
    }
}

/// Dash-separated slug used to derive entity and column ids.
pub fn slugify(value: &str) -> String {
    collapse(value, '-')
}

/// Suffixes `base` with `-2`, `-3`, ... until it no longer collides.
pub fn ensure_unique_id(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_lowercases_and_collapses() {
        assert_eq!(label_fragment("Cliente"), "cliente");
        assert_eq!(label_fragment("Detalle  Venta"), "detalle_venta");
        assert_eq!(label_fragment("Pedido-Online!"), "pedido_online");
    }

    #[test]
    fn fragment_folds_spanish_accents() {
        assert_eq!(label_fragment("Categoría"), "categoria");
        assert_eq!(label_fragment("Niño"), "nino");
    }

    #[test]
    fn fragment_falls_back_for_empty_labels() {
        assert_eq!(label_fragment(""), "relacion");
        assert_eq!(label_fragment("¡¿!?"), "relacion");
    }

    #[test]
    fn slugify_uses_dashes() {
        assert_eq!(slugify("Detalle Venta"), "detalle-venta");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn unique_id_appends_numeric_suffix() {
        let used: HashSet<String> = ["node-pedido".to_string(), "node-pedido-2".to_string()]
            .into_iter()
            .collect();
        assert_eq!(ensure_unique_id("node-pedido", &used), "node-pedido-3");
        assert_eq!(ensure_unique_id("node-cliente", &used), "node-cliente");
    }
}
