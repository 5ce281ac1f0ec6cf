use std::fmt;
use std::str::FromStr;

use crate::FeatureError;
use crate::Result;

/// Longest identifier the wire format allows
pub const MAX_OID_LEN: usize = 128;

/// Hierarchical object identifier, ordered lexicographically by sub-identifier
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(sub_ids: Vec<u32>) -> Self {
        Oid(sub_ids)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `self` lies in the subtree rooted at `root` (inclusive)
    pub fn starts_with(
        &self,
        root: &Oid,
    ) -> bool {
        self.0.starts_with(&root.0)
    }

    pub fn child(
        &self,
        sub_id: u32,
    ) -> Oid {
        let mut sub_ids = self.0.clone();
        sub_ids.push(sub_id);
        Oid(sub_ids)
    }

    /// Smallest identifier strictly greater than `self`.
    ///
    /// Appends `.0` while there is room. At [`MAX_OID_LEN`] the rightmost
    /// sub-identifier below `u32::MAX` is incremented and everything after it
    /// dropped. An identifier made only of `u32::MAX` at full length has no
    /// successor and is returned unchanged.
    pub fn successor(&self) -> Oid {
        if self.0.len() < MAX_OID_LEN {
            return self.child(0);
        }

        match self.0.iter().rposition(|sub_id| *sub_id < u32::MAX) {
            Some(pos) => {
                let mut sub_ids = self.0[..=pos].to_vec();
                sub_ids[pos] += 1;
                Oid(sub_ids)
            }
            None => self.clone(),
        }
    }
}

impl FromStr for Oid {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let conversion = || FeatureError::Conversion {
            value: s.to_string(),
            expected: "object identifier".to_string(),
        };
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(conversion().into());
        }
        let sub_ids = trimmed
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| conversion()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if sub_ids.len() > MAX_OID_LEN {
            return Err(conversion().into());
        }
        Ok(Oid(sub_ids))
    }
}

impl fmt::Display for Oid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, sub_id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{sub_id}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Oid({self})")
    }
}

impl From<&[u32]> for Oid {
    fn from(sub_ids: &[u32]) -> Self {
        Oid(sub_ids.to_vec())
    }
}
