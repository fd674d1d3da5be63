//! 勾配ブースティング木モデル
//!
//! 学習側で `get_dump(dump_format="json")` した木のリストをそのまま読む。
//! ファイルは木の配列か、`{ "base_score", "feature_names", "trees" }` の
//! どちらかの形式を受け付ける。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::diagnosis::{ClassifierError, FeatureVector, HealthModel, FEATURE_NAMES};

/// モデル読み込みのエラー
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("モデルファイルを読めません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("モデルの JSON が不正です: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("未知の特徴量です: {0}")]
    UnknownFeature(String),

    #[error("木 {tree} がノード {node} を参照していますが存在しません")]
    MissingNode { tree: usize, node: u32 },

    #[error("木 {tree} にノード {node} が重複しています")]
    DuplicateNode { tree: usize, node: u32 },

    #[error("base_score は 0 と 1 の間である必要があります: {0}")]
    InvalidBaseScore(f32),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Split {
        nodeid: u32,
        split: String,
        split_condition: f32,
        yes: u32,
        no: u32,
        #[serde(default)]
        children: Vec<RawNode>,
    },
    Leaf {
        nodeid: u32,
        leaf: f32,
    },
}

impl RawNode {
    fn nodeid(&self) -> u32 {
        match self {
            RawNode::Split { nodeid, .. } | RawNode::Leaf { nodeid, .. } => *nodeid,
        }
    }
}

fn default_base_score() -> f32 {
    0.5
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawModel {
    Trees(Vec<RawNode>),
    Document {
        #[serde(default = "default_base_score")]
        base_score: f32,
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        trees: Vec<RawNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        yes: usize,
        no: usize,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct Tree {
    /// 先頭が根
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, features: &[f32; 4]) -> Result<f32, ClassifierError> {
        let mut index = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes[index] {
                Node::Leaf(value) => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    index = if features[feature] < threshold { yes } else { no };
                }
            }
        }
        Err(ClassifierError::Model("木の走査が葉に到達しません".to_string()))
    }
}

/// 二値ロジスティック木アンサンブル
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    base_margin: f32,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json_str(&text)?;
        info!(
            "モデルを読み込みました: {} ({}本の木)",
            path.display(),
            model.tree_count()
        );
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let (base_score, feature_names, raw_trees) = match serde_json::from_str(text)? {
            RawModel::Trees(trees) => (default_base_score(), None, trees),
            RawModel::Document {
                base_score,
                feature_names,
                trees,
            } => (base_score, feature_names, trees),
        };

        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ModelError::InvalidBaseScore(base_score));
        }

        let trees = raw_trees
            .iter()
            .enumerate()
            .map(|(i, root)| compile_tree(i, root, feature_names.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_margin: (base_score / (1.0 - base_score)).ln(),
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// ロジット（base_score のロジット + 各木の葉の値）
    pub fn margin(&self, features: &FeatureVector) -> Result<f32, ClassifierError> {
        let values = features.values();
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.leaf_value(values)?;
        }
        Ok(margin)
    }

    pub fn probability(&self, features: &FeatureVector) -> Result<f32, ClassifierError> {
        Ok(1.0 / (1.0 + (-self.margin(features)?).exp()))
    }
}

impl HealthModel for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        let margin = self.margin(features)?;
        debug!("モデル出力 margin={:.4}", margin);
        Ok(u8::from(margin >= 0.0))
    }
}

fn resolve_feature(name: &str, feature_names: Option<&[String]>) -> Result<usize, ModelError> {
    let index = if let Some(i) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        Some(i)
    } else if let Some(names) = feature_names {
        names.iter().position(|n| n == name)
    } else {
        match name {
            "moisture" => Some(2),
            other => FEATURE_NAMES.iter().position(|n| *n == other),
        }
    };

    match index {
        Some(i) if i < FEATURE_NAMES.len() => Ok(i),
        _ => Err(ModelError::UnknownFeature(name.to_string())),
    }
}

fn flatten<'a>(node: &'a RawNode, out: &mut Vec<&'a RawNode>) {
    out.push(node);
    if let RawNode::Split { children, .. } = node {
        for child in children {
            flatten(child, out);
        }
    }
}

fn compile_tree(
    tree_index: usize,
    root: &RawNode,
    feature_names: Option<&[String]>,
) -> Result<Tree, ModelError> {
    let mut raw_nodes = Vec::new();
    flatten(root, &mut raw_nodes);

    let mut positions: HashMap<u32, usize> = HashMap::with_capacity(raw_nodes.len());
    for (i, node) in raw_nodes.iter().enumerate() {
        if positions.insert(node.nodeid(), i).is_some() {
            return Err(ModelError::DuplicateNode {
                tree: tree_index,
                node: node.nodeid(),
            });
        }
    }
    let lookup = |node: u32| {
        positions.get(&node).copied().ok_or(ModelError::MissingNode {
            tree: tree_index,
            node,
        })
    };

    let nodes = raw_nodes
        .iter()
        .map(|node| match node {
            RawNode::Leaf { leaf, .. } => Ok(Node::Leaf(*leaf)),
            RawNode::Split {
                split,
                split_condition,
                yes,
                no,
                ..
            } => Ok(Node::Split {
                feature: resolve_feature(split, feature_names)?,
                threshold: *split_condition,
                yes: lookup(*yes)?,
                no: lookup(*no)?,
            }),
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(Tree { nodes })
}
