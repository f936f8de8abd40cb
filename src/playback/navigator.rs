//! Playlist navigation - next/prev index calculation
//!
//! Both directions wrap around at the ends of the playlist.

pub struct Navigator {
    len: usize,
    current: usize,
}

impl Navigator {
    pub fn new(len: usize, current: usize) -> Self {
        Self { len, current }
    }

    /// Calculate the next index; `None` for an empty playlist
    pub fn next_index(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        Some((self.current + 1) % self.len)
    }

    /// Calculate the previous index; `None` for an empty playlist
    pub fn prev_index(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let current = self.current.min(self.len - 1);
        Some((current + self.len - 1) % self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_wraps() {
        assert_eq!(Navigator::new(3, 2).next_index(), Some(0));
        assert_eq!(Navigator::new(3, 0).next_index(), Some(1));
    }

    #[test]
    fn test_prev_wraps() {
        assert_eq!(Navigator::new(3, 0).prev_index(), Some(2));
        assert_eq!(Navigator::new(3, 2).prev_index(), Some(1));
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        for len in 1..6 {
            for start in 0..len {
                let mut index = start;
                for _ in 0..len {
                    index = Navigator::new(len, index).next_index().unwrap();
                }
                assert_eq!(index, start);
            }
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(Navigator::new(0, 0).next_index(), None);
        assert_eq!(Navigator::new(0, 0).prev_index(), None);
    }
}
