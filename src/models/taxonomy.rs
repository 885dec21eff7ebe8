use serde::{Deserialize, Serialize};

/// Selector for one of the three tag vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    Region,
    Structure,
    Trigger,
}

impl TagKind {
    pub const ALL: [TagKind; 3] = [TagKind::Region, TagKind::Structure, TagKind::Trigger];

    /// Column header used by the taxonomy mirror sheet.
    pub fn header(&self) -> &'static str {
        match self {
            TagKind::Region => "Região",
            TagKind::Structure => "Estrutura",
            TagKind::Trigger => "Gatilho",
        }
    }

    /// Zero-based column position in the taxonomy sheet.
    pub fn column(&self) -> usize {
        match self {
            TagKind::Region => 0,
            TagKind::Structure => 1,
            TagKind::Trigger => 2,
        }
    }
}

/// The three growable vocabularies of categorical tags. Each list holds
/// unique trimmed strings; membership is exact string equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagTaxonomy {
    pub regions: Vec<String>,
    pub structures: Vec<String>,
    pub triggers: Vec<String>,
}

impl Default for TagTaxonomy {
    fn default() -> Self {
        Self {
            regions: vec![
                "Suporte".to_string(),
                "Resistência".to_string(),
                "Topo Histórico".to_string(),
                "Fundo Anterior".to_string(),
            ],
            structures: vec![
                "Rompimento".to_string(),
                "Pullback".to_string(),
                "Reversão".to_string(),
                "Consolidação".to_string(),
            ],
            triggers: vec![
                "Pivot de Alta".to_string(),
                "Pivot de Baixa".to_string(),
                "Engolfo".to_string(),
                "Martelo".to_string(),
            ],
        }
    }
}

impl TagTaxonomy {
    /// Empty taxonomy, used when merging from scratch in tests.
    pub fn empty() -> Self {
        Self {
            regions: Vec::new(),
            structures: Vec::new(),
            triggers: Vec::new(),
        }
    }

    pub fn list(&self, kind: TagKind) -> &[String] {
        match kind {
            TagKind::Region => &self.regions,
            TagKind::Structure => &self.structures,
            TagKind::Trigger => &self.triggers,
        }
    }

    fn list_mut(&mut self, kind: TagKind) -> &mut Vec<String> {
        match kind {
            TagKind::Region => &mut self.regions,
            TagKind::Structure => &mut self.structures,
            TagKind::Trigger => &mut self.triggers,
        }
    }

    /// Add a tag value. Returns false when the trimmed value is empty or
    /// already present.
    pub fn add(&mut self, kind: TagKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let list = self.list_mut(kind);
        if list.iter().any(|v| v == value) {
            return false;
        }
        list.push(value.to_string());
        true
    }

    /// Remove an exact tag value. Returns whether it was present.
    pub fn remove(&mut self, kind: TagKind, value: &str) -> bool {
        let value = value.trim();
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|v| v != value);
        list.len() != before
    }

    /// Absorb a tag value a trade introduced implicitly. Same semantics as
    /// `add`; named separately so call sites read as what they do.
    pub fn absorb(&mut self, kind: TagKind, value: &str) -> bool {
        self.add(kind, value)
    }

    /// Merge one vocabulary with its remote counterpart: union, dedupe and
    /// sort lexicographically. The local list is replaced only when the
    /// merged result differs from it by length or positional order; the
    /// return value tells the caller whether a remote rewrite is due.
    pub fn merge_remote(&mut self, kind: TagKind, remote: &[String]) -> bool {
        let list = self.list_mut(kind);
        let mut merged: Vec<String> = list.clone();
        for value in remote {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if !merged.iter().any(|v| v == value) {
                merged.push(value.to_string());
            }
        }
        merged.sort();

        if merged.len() != list.len() || merged.iter().zip(list.iter()).any(|(a, b)| a != b) {
            *list = merged;
            true
        } else {
            false
        }
    }
}
