use tracing::info;

use crate::ident;
use crate::models::{
    normalize_relationship, Column, Entity, EntityData, Graph, NewRelationship,
    NewRelationshipData, Position, ENTITY_NODE_TYPE,
};

/// Canned diagrams served when the generation service is unreachable.
///
/// Matching is a plain keyword scan over the accent-folded prompt; anything
/// outside the built-in vocabulary returns `None` and the caller surfaces
/// the transport error instead.
pub fn offline_fallback(prompt: &str) -> Option<Graph> {
    let folded = ident::label_fragment(prompt);
    if folded.contains("supermercado") || folded.contains("supermarket") {
        info!(target: "er_canvas::fallback", "sirviendo diagrama de supermercado sin conexion");
        return Some(supermarket_graph());
    }
    if folded.contains("usuario") && (folded.contains("post") || folded.contains("publicacion")) {
        info!(target: "er_canvas::fallback", "sirviendo diagrama usuario/post sin conexion");
        return Some(user_post_graph());
    }
    None
}

fn table(id: &str, label: &str, x: f64, y: f64, extra: &[(&str, &str)]) -> Entity {
    let mut columns = vec![Column::new(format!("{id}-id"), "id", "INT").primary_key()];
    for (name, column_type) in extra {
        columns.push(Column::new(format!("{id}-{name}"), *name, *column_type));
    }
    Entity {
        id: id.into(),
        node_type: Some(ENTITY_NODE_TYPE.to_string()),
        position: Position::new(x, y),
        data: EntityData {
            label: label.to_string(),
            columns,
            ..Default::default()
        },
    }
}

fn one_to_many(id: &str, source: &str, target: &str) -> NewRelationship {
    NewRelationship {
        id: id.into(),
        source: source.into(),
        target: target.into(),
        label: None,
        data: Some(NewRelationshipData {
            kind: Some("simple".to_string()),
            source_mult: Some("1".to_string()),
            target_mult: Some("*".to_string()),
            ..Default::default()
        }),
    }
}

fn graph_of(nodes: Vec<Entity>, edges: Vec<NewRelationship>) -> Graph {
    Graph {
        nodes,
        edges: edges.into_iter().map(normalize_relationship).collect(),
    }
}

fn supermarket_graph() -> Graph {
    let mut detalle = table(
        "node-detalleventa",
        "DetalleVenta",
        520.0,
        520.0,
        &[
            ("venta_id", "INT"),
            ("producto_id", "INT"),
            ("cantidad", "INT"),
            ("precio_unitario", "DECIMAL(10,2)"),
        ],
    );
    detalle.data.is_join = true;
    detalle.data.join_of = Some(["Ventas".to_string(), "Productos".to_string()]);

    let nodes = vec![
        table(
            "node-productos",
            "Productos",
            420.0,
            60.0,
            &[
                ("nombre", "VARCHAR(120)"),
                ("precio", "DECIMAL(10,2)"),
                ("categoria_id", "INT"),
                ("proveedor_id", "INT"),
            ],
        ),
        table(
            "node-categorias",
            "Categorias",
            80.0,
            60.0,
            &[("nombre", "VARCHAR(80)")],
        ),
        table(
            "node-proveedores",
            "Proveedores",
            760.0,
            60.0,
            &[("nombre", "VARCHAR(120)"), ("telefono", "VARCHAR(20)")],
        ),
        table(
            "node-clientes",
            "Clientes",
            80.0,
            320.0,
            &[("nombre", "VARCHAR(120)"), ("email", "VARCHAR(120)")],
        ),
        table(
            "node-empleados",
            "Empleados",
            760.0,
            320.0,
            &[("nombre", "VARCHAR(120)"), ("puesto", "VARCHAR(60)")],
        ),
        table(
            "node-ventas",
            "Ventas",
            420.0,
            320.0,
            &[
                ("cliente_id", "INT"),
                ("empleado_id", "INT"),
                ("fecha", "DATETIME"),
                ("total", "DECIMAL(10,2)"),
            ],
        ),
        detalle,
        table(
            "node-inventario",
            "Inventario",
            80.0,
            520.0,
            &[("producto_id", "INT"), ("stock", "INT")],
        ),
    ];

    let edges = vec![
        one_to_many("edge-categorias-productos", "node-categorias", "node-productos"),
        one_to_many("edge-proveedores-productos", "node-proveedores", "node-productos"),
        one_to_many("edge-clientes-ventas", "node-clientes", "node-ventas"),
        one_to_many("edge-empleados-ventas", "node-empleados", "node-ventas"),
        one_to_many("edge-ventas-detalleventa", "node-ventas", "node-detalleventa"),
        one_to_many("edge-productos-detalleventa", "node-productos", "node-detalleventa"),
        one_to_many("edge-productos-inventario", "node-productos", "node-inventario"),
    ];

    graph_of(nodes, edges)
}

fn user_post_graph() -> Graph {
    let nodes = vec![
        table(
            "node-usuario",
            "Usuario",
            120.0,
            120.0,
            &[("nombre", "VARCHAR(120)"), ("email", "VARCHAR(120)")],
        ),
        table(
            "node-post",
            "Post",
            520.0,
            120.0,
            &[
                ("usuario_id", "INT"),
                ("titulo", "VARCHAR(200)"),
                ("contenido", "TEXT"),
            ],
        ),
    ];
    let mut edge = one_to_many("edge-usuario-post", "node-usuario", "node-post");
    if let Some(data) = edge.data.as_mut() {
        data.label = Some("Usuario crea Post".to_string());
    }
    graph_of(nodes, vec![edge])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::graph_invariant_violations;

    #[test]
    fn supermarket_prompt_yields_full_schema() {
        let graph = offline_fallback("Hazme la base de datos de un supermercado")
            .expect("supermarket keyword should match");
        assert_eq!(graph.nodes.len(), 8);
        assert_eq!(graph.edges.len(), 7);
        assert!(graph_invariant_violations(&graph.nodes, &graph.edges).is_empty());

        let detalle = graph
            .nodes
            .iter()
            .find(|node| node.data.label == "DetalleVenta")
            .expect("join table should be present");
        assert!(detalle.data.is_join);
        assert_eq!(
            detalle.data.join_of,
            Some(["Ventas".to_string(), "Productos".to_string()])
        );
    }

    #[test]
    fn user_post_prompt_yields_two_tables_and_labeled_edge() {
        let graph = offline_fallback("Crea tablas Usuario y Post")
            .expect("usuario/post keywords should match");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].label, "Usuario crea Post");
        assert!(graph_invariant_violations(&graph.nodes, &graph.edges).is_empty());
    }

    #[test]
    fn accented_publicacion_matches() {
        assert!(offline_fallback("un usuario escribe una publicación").is_some());
    }

    #[test]
    fn usuario_alone_is_not_enough() {
        assert!(offline_fallback("tabla de usuario y direcciones").is_none());
    }

    #[test]
    fn unknown_vocabulary_returns_none() {
        assert!(offline_fallback("sistema de reservas de vuelos").is_none());
    }
}
