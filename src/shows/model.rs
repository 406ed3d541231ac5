use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub(super) struct TreeNode {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The parts of a GitHub git tree listing we use.
#[derive(Deserialize, Debug, Clone, Default)]
pub(super) struct Tree {
    pub tree: Vec<TreeNode>,
    #[serde(default)]
    pub truncated: bool,
}

impl Tree {
    /// Show ids of the track list files in the tree, sorted. Track lists live at
    /// `<year>/<yy-mm-dd>.txt`.
    pub fn show_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tree
            .iter()
            .filter(|n| n.kind == "blob" && n.path.starts_with("20") && n.path.ends_with(".txt"))
            .map(|n| {
                let file = n.path.rsplit_once('/').map_or(n.path.as_str(), |(_, f)| f);
                file.split_once('.').map_or(file, |(id, _)| id).to_string()
            })
            .collect();
        ids.sort();
        ids
    }
}
