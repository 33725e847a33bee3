//! Greedy chunk packing
//!
//! Each file becomes one section (`--- FILE: path ---` header plus content).
//! Sections are appended to the open chunk until the next one would push it
//! past the byte limit. Files are never split: a section larger than the limit
//! forms a chunk of its own.

use tracing::debug;

/// Serialized form of one file inside a chunk
pub fn format_section(path: &str, content: &str) -> String {
    format!("\n\n--- FILE: {} ---\n{}", path, content)
}

/// A batch of file sections sent as one completion request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// (path, content) pairs in insertion order
    pub files: Vec<(String, String)>,
    /// Concatenated sections
    pub payload: String,
}

impl Chunk {
    /// Serialized length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(path, _)| path.as_str())
    }

    fn push(&mut self, path: &str, content: &str, section: &str) {
        self.files.push((path.to_string(), content.to_string()));
        self.payload.push_str(section);
    }
}

/// Summary logged after chunking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub chunks: usize,
    pub files: usize,
    pub total_bytes: usize,
    pub largest: usize,
    /// Single-file chunks above the limit
    pub oversized: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chunk_size: usize,
}

impl Chunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Pack files into chunks, preserving input order
    pub fn chunk<'a, I>(&self, files: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut chunks = Vec::new();
        let mut current = Chunk::default();

        for (path, content) in files {
            let section = format_section(path, content);
            if !current.is_empty() && current.len() + section.len() > self.max_chunk_size {
                debug!(
                    files = current.files.len(),
                    bytes = current.len(),
                    "Closing chunk"
                );
                chunks.push(std::mem::take(&mut current));
            }
            current.push(path, content, &section);
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    pub fn stats(&self, chunks: &[Chunk]) -> ChunkStats {
        ChunkStats {
            chunks: chunks.len(),
            files: chunks.iter().map(|c| c.files.len()).sum(),
            total_bytes: chunks.iter().map(Chunk::len).sum(),
            largest: chunks.iter().map(Chunk::len).max().unwrap_or(0),
            oversized: chunks
                .iter()
                .filter(|c| c.len() > self.max_chunk_size)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owned(files: &[(&str, String)]) -> Vec<(String, String)> {
        files
            .iter()
            .map(|(p, c)| (p.to_string(), c.clone()))
            .collect()
    }

    fn run(chunker: &Chunker, files: &[(String, String)]) -> Vec<Chunk> {
        chunker.chunk(files.iter().map(|(p, c)| (p.as_str(), c.as_str())))
    }

    #[test]
    fn test_greedy_packing_keeps_order() {
        let files = owned(&[
            ("a.rs", "a".repeat(1500)),
            ("b.rs", "b".repeat(2000)),
            ("c.rs", "c".repeat(3000)),
        ]);
        let chunks = run(&Chunker::new(4000), &files);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].paths().collect::<Vec<_>>(), vec!["a.rs", "b.rs"]);
        assert_eq!(chunks[1].paths().collect::<Vec<_>>(), vec!["c.rs"]);
        assert!(chunks.iter().all(|c| c.len() <= 4000));
    }

    #[test]
    fn test_oversized_file_is_its_own_chunk() {
        let big = "x".repeat(5000);
        let files = owned(&[
            ("small.rs", "s".repeat(100)),
            ("big.rs", big.clone()),
            ("tail.rs", "t".repeat(100)),
        ]);
        let chunker = Chunker::new(1000);
        let chunks = run(&chunker, &files);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].files, vec![("big.rs".to_string(), big.clone())]);
        assert!(chunks[1].payload.ends_with(&big));

        let stats = chunker.stats(&chunks);
        assert_eq!(stats.oversized, 1);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.largest, chunks[1].len());
    }

    #[test]
    fn test_section_format_and_empty_input() {
        assert_eq!(format_section("a.rs", "x"), "\n\n--- FILE: a.rs ---\nx");
        assert!(Chunker::new(10).chunk(std::iter::empty()).is_empty());
        assert_eq!(Chunker::new(10).stats(&[]), ChunkStats::default());
    }

    #[test]
    fn test_size_is_measured_in_bytes() {
        // 3 bytes per char
        let files = owned(&[("a", "한".repeat(10)), ("b", "한".repeat(10))]);
        let section = format_section("a", &"한".repeat(10)).len();
        let chunks = run(&Chunker::new(section * 2 - 1), &files);
        assert_eq!(chunks.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_chunks_respect_bound_and_order(
            sizes in proptest::collection::vec(0usize..600, 0..30),
            max in 50usize..1500,
        ) {
            let files: Vec<(String, String)> = sizes
                .iter()
                .enumerate()
                .map(|(i, n)| (format!("f{}.rs", i), "z".repeat(*n)))
                .collect();
            let chunks = run(&Chunker::new(max), &files);

            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.len() <= max || chunk.files.len() == 1);
            }

            let flattened: Vec<(String, String)> =
                chunks.iter().flat_map(|c| c.files.clone()).collect();
            prop_assert_eq!(&flattened, &files);

            let payload: String = chunks.iter().map(|c| c.payload.as_str()).collect();
            let expected: String = files.iter().map(|(p, c)| format_section(p, c)).collect();
            prop_assert_eq!(payload, expected);

            prop_assert_eq!(run(&Chunker::new(max), &files), chunks);
        }
    }
}
