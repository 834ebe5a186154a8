// preferences.rs — Display configuration
//
// Plain value passed to the formatting and DOT layers. Serializable so that
// callers can keep it wherever they keep their settings; this crate never
// reads or writes it from disk. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::context::ContextFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Mode used when none is given explicitly.
    pub context_format: ContextFormat,
    /// Label process edges with the variable they carry.
    pub label_edges: bool,
    pub background_color: String,
    pub edge_color: String,
    pub label_color: String,
    /// Cluster colors, cycled by nesting depth.
    pub depth_colors: Vec<String>,
    pub node_color: String,
    pub node_label_color: String,
    pub node_periphery_color: String,
    /// Fill clusters instead of outlining them.
    pub fill_cluster: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            context_format: ContextFormat::Named,
            label_edges: true,
            background_color: "transparent".to_string(),
            edge_color: "#90918e".to_string(),
            label_color: "#90918e".to_string(),
            depth_colors: vec!["#f98f609f".to_string()],
            node_color: "#555f69".to_string(),
            node_label_color: "white".to_string(),
            node_periphery_color: "#90918e".to_string(),
            fill_cluster: false,
        }
    }
}

impl Preferences {
    /// Classic palette: gray edges, outlined orange clusters.
    pub fn classic_mode(&mut self) {
        self.set_palette(Palette {
            edge: "#90918e",
            label: "#90918e",
            background: "transparent",
            clusters: &["#f98f609f"],
            node: "#555f69",
            node_label: "white",
            node_periphery: "none",
            fill_cluster: false,
        });
    }

    pub fn dark_mode(&mut self) {
        self.set_palette(Palette {
            edge: "#98a2ad",
            label: "#e5e5e5",
            background: "transparent",
            clusters: &["#5172512f"],
            node: "#555f69",
            node_label: "white",
            node_periphery: "none",
            fill_cluster: true,
        });
    }

    pub fn light_mode(&mut self) {
        self.set_palette(Palette {
            edge: "#4e4e4e",
            label: "#4e4e4e",
            background: "#ffffffff",
            clusters: &["#7ac0832f"],
            node: "white:#CDCDCD",
            node_label: "black",
            node_periphery: "#4e4e4e",
            fill_cluster: true,
        });
    }

    /// Cluster color for a composite at nesting `depth` (1 = outermost).
    pub fn depth_color(&self, depth: usize) -> &str {
        if self.depth_colors.is_empty() {
            return "none";
        }
        let n = self.depth_colors.len();
        &self.depth_colors[depth.saturating_sub(1) % n]
    }

    fn set_palette(&mut self, p: Palette) {
        self.edge_color = p.edge.to_string();
        self.label_color = p.label.to_string();
        self.background_color = p.background.to_string();
        self.depth_colors = p.clusters.iter().map(|c| c.to_string()).collect();
        self.node_color = p.node.to_string();
        self.node_label_color = p.node_label.to_string();
        self.node_periphery_color = p.node_periphery.to_string();
        self.fill_cluster = p.fill_cluster;
    }
}

struct Palette {
    edge: &'static str,
    label: &'static str,
    background: &'static str,
    clusters: &'static [&'static str],
    node: &'static str,
    node_label: &'static str,
    node_periphery: &'static str,
    fill_cluster: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_mode_fills_clusters() {
        let mut prefs = Preferences::default();
        prefs.dark_mode();
        assert!(prefs.fill_cluster);
        assert_eq!(prefs.edge_color, "#98a2ad");
        assert_eq!(prefs.node_periphery_color, "none");
        prefs.classic_mode();
        assert!(!prefs.fill_cluster);
    }

    #[test]
    fn depth_colors_cycle() {
        let prefs = Preferences {
            depth_colors: vec!["a".into(), "b".into()],
            ..Preferences::default()
        };
        assert_eq!(prefs.depth_color(1), "a");
        assert_eq!(prefs.depth_color(2), "b");
        assert_eq!(prefs.depth_color(3), "a");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"context_format": "formal"}"#).unwrap();
        assert_eq!(prefs.context_format, ContextFormat::Formal);
        assert_eq!(prefs.edge_color, "#90918e");
        let json = serde_json::to_string(&Preferences::default()).unwrap();
        assert!(json.contains(r#""context_format":"named""#));
    }
}
