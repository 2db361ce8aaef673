//! Wavefront OBJ parser supporting object names, positions, normals, texture
//! coordinates and triangular faces.
//!
//! Face indices are kept exactly as written (1-based); turning them into array
//! offsets is left to consumers such as [`crate::mesh::MeshData::from_obj`].

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use corelib::{FormatError, FormatResult};

/// Longest accepted line in bytes (terminator excluded) unless overridden.
pub const DEFAULT_MAX_LINE_LEN: usize = 256;

/// Homogeneous position; `w` defaults to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Vertex4 {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Vertex4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Fill components positionally, keeping defaults for missing ones.
    pub fn from_components(values: &[f32]) -> Self {
        let mut v = Self::default();
        for (slot, value) in [&mut v.x, &mut v.y, &mut v.z, &mut v.w]
            .into_iter()
            .zip(values)
        {
            *slot = *value;
        }
        v
    }
}

/// Normal or texture coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_components(values: &[f32]) -> Self {
        let mut v = Self::default();
        for (slot, value) in [&mut v.x, &mut v.y, &mut v.z].into_iter().zip(values) {
            *slot = *value;
        }
        v
    }
}

/// One face corner. `None` means the attribute was not given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceVertexRef {
    pub vertex: Option<u32>,
    pub uv: Option<u32>,
    pub normal: Option<u32>,
}

impl FaceVertexRef {
    pub fn has_vertex(&self) -> bool {
        self.vertex.is_some()
    }

    pub fn has_uv(&self) -> bool {
        self.uv.is_some()
    }

    pub fn has_normal(&self) -> bool {
        self.normal.is_some()
    }
}

/// Triangle face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Face {
    pub corners: [FaceVertexRef; 3],
}

/// Everything collected from one OBJ source, in file order.
#[derive(Debug, Default)]
pub struct ObjData {
    object_name: Option<String>,
    vertices: Vec<Vertex4>,
    normals: Vec<Vertex3>,
    uvs: Vec<Vertex3>,
    faces: Vec<Face>,
    warnings: Vec<FormatError>,
}

impl ObjData {
    /// Name from the last `o` line.
    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn vertices(&self) -> &[Vertex4] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vertex3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vertex3] {
        &self.uvs
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Recoverable problems (skipped lines).
    pub fn warnings(&self) -> &[FormatError] {
        &self.warnings
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Directive {
    Object,
    Vertex,
    TexCoord,
    Normal,
    Face,
}

const DIRECTIVES: &[(&str, Directive)] = &[
    ("o", Directive::Object),
    ("v", Directive::Vertex),
    ("vt", Directive::TexCoord),
    ("vn", Directive::Normal),
    ("f", Directive::Face),
];

impl Directive {
    fn lookup(keyword: &str) -> Option<Self> {
        DIRECTIVES
            .iter()
            .find(|(name, _)| *name == keyword)
            .map(|(_, directive)| *directive)
    }
}

/// Configurable OBJ parser.
#[derive(Clone, Copy, Debug)]
pub struct ObjParser {
    max_line_len: usize,
}

impl Default for ObjParser {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl ObjParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the line-length limit.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    pub fn parse_path(&self, path: impl AsRef<Path>) -> FormatResult<ObjData> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
        self.parse_lines(BufReader::new(file), path)
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> FormatResult<ObjData> {
        self.parse_lines(reader, Path::new("<reader>"))
    }

    pub fn parse_str(&self, contents: &str) -> FormatResult<ObjData> {
        self.parse_lines(io::Cursor::new(contents), Path::new("<string>"))
    }

    fn parse_lines<R: BufRead>(&self, mut reader: R, origin: &Path) -> FormatResult<ObjData> {
        let mut data = ObjData::default();
        // Longest accepted line plus a CRLF terminator.
        let limit = (self.max_line_len as u64).saturating_add(2);
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            let read = (&mut reader)
                .take(limit)
                .read_until(b'\n', &mut buf)
                .map_err(|e| FormatError::io(origin, e))?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let line = trim_terminator(&buf);
            if line.len() > self.max_line_len {
                return Err(FormatError::LineTooLong {
                    line: line_no,
                    len: line.len(),
                    max: self.max_line_len,
                });
            }

            // Comments may hold any encoding; only the directive part must be UTF-8.
            let content = std::str::from_utf8(strip_comment(line)).map_err(|e| {
                FormatError::InvalidText {
                    line: line_no,
                    column: e.valid_up_to() + 1,
                }
            })?;
            parse_line(&mut data, line_no, content)?;
        }

        log::debug!(
            "Parsed OBJ {}: {} vertices, {} normals, {} uvs, {} faces, {} warnings",
            origin.display(),
            data.vertices.len(),
            data.normals.len(),
            data.uvs.len(),
            data.faces.len(),
            data.warnings.len()
        );

        Ok(data)
    }
}

/// Load an OBJ file with default options.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> FormatResult<ObjData> {
    ObjParser::default().parse_path(path)
}

/// Load OBJ data from a [`BufRead`] implementation with default options.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> FormatResult<ObjData> {
    ObjParser::default().parse_reader(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> FormatResult<ObjData> {
    ObjParser::default().parse_str(contents)
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn strip_comment(line: &[u8]) -> &[u8] {
    match line.iter().position(|&b| b == b'#') {
        Some(hash) => &line[..hash],
        None => line,
    }
}

/// Dispatch one comment-free line.
fn parse_line(data: &mut ObjData, line_no: usize, content: &str) -> FormatResult<()> {
    let mut parts = content.split_whitespace();
    let Some(keyword) = parts.next() else {
        return Ok(());
    };

    let Some(directive) = Directive::lookup(keyword) else {
        log::warn!("Skipping unknown OBJ directive '{}' on line {}", keyword, line_no);
        data.warnings.push(FormatError::UnknownDirective {
            line: line_no,
            directive: keyword.to_owned(),
        });
        return Ok(());
    };

    match directive {
        Directive::Object => {
            if let Some(name) = parts.next() {
                data.object_name = Some(name.to_owned());
            }
        }
        Directive::Vertex => {
            let values = parse_floats(parts.take(4), line_no)?;
            if !values.is_empty() {
                data.vertices.push(Vertex4::from_components(&values));
            }
        }
        Directive::TexCoord => {
            let values = parse_floats(parts.take(3), line_no)?;
            if !values.is_empty() {
                data.uvs.push(Vertex3::from_components(&values));
            }
        }
        Directive::Normal => {
            let values = parse_floats(parts.take(3), line_no)?;
            if !values.is_empty() {
                data.normals.push(Vertex3::from_components(&values));
            }
        }
        Directive::Face => {
            let tokens: Vec<&str> = parts.collect();
            let &[a, b, c] = tokens.as_slice() else {
                return Err(FormatError::MalformedFace {
                    line: line_no,
                    reason: format!("expected 3 vertex references, found {}", tokens.len()),
                });
            };
            data.faces.push(Face {
                corners: [
                    parse_face_vertex(a, line_no)?,
                    parse_face_vertex(b, line_no)?,
                    parse_face_vertex(c, line_no)?,
                ],
            });
        }
    }

    Ok(())
}

fn parse_floats<'a>(
    tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> FormatResult<Vec<f32>> {
    tokens
        .map(|token| {
            token.parse::<f32>().map_err(|_| FormatError::InvalidNumber {
                line: line_no,
                token: token.to_owned(),
            })
        })
        .collect()
}

/// Parse `v`, `v/vt`, `v/vt/vn` or `v//vn`.
fn parse_face_vertex(token: &str, line_no: usize) -> FormatResult<FaceVertexRef> {
    let malformed = |reason: String| FormatError::MalformedFace {
        line: line_no,
        reason,
    };

    let segments: Vec<&str> = token.split('/').collect();
    let (vertex, uv, normal) = match *segments.as_slice() {
        [v] => (v, "", ""),
        [v, uv] => (v, uv, ""),
        [v, uv, n] => (v, uv, n),
        _ => {
            return Err(malformed(format!(
                "'{}' has {} '/' separators, at most 2 allowed",
                token,
                segments.len() - 1
            )));
        }
    };

    let desc = FaceVertexRef {
        vertex: parse_index(vertex, token, line_no)?,
        uv: parse_index(uv, token, line_no)?,
        normal: parse_index(normal, token, line_no)?,
    };

    if desc == FaceVertexRef::default() {
        return Err(malformed(format!("'{}' references no vertex data", token)));
    }

    Ok(desc)
}

fn parse_index(segment: &str, token: &str, line_no: usize) -> FormatResult<Option<u32>> {
    if segment.is_empty() {
        return Ok(None);
    }

    let reason = if segment.starts_with('-') {
        format!("negative index in '{}' (relative indices are not supported)", token)
    } else {
        match segment.parse::<u32>() {
            Ok(0) => format!("index 0 in '{}' (OBJ indices are 1-based)", token),
            Ok(idx) => return Ok(Some(idx)),
            Err(_) => format!("invalid index '{}' in '{}'", segment, token),
        }
    };

    Err(FormatError::MalformedFace {
        line: line_no,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(vertex: Option<u32>, uv: Option<u32>, normal: Option<u32>) -> FaceVertexRef {
        FaceVertexRef { vertex, uv, normal }
    }

    fn single_face(src: &str) -> Face {
        let data = load_obj_from_str(src).expect("parse face");
        assert_eq!(data.faces().len(), 1);
        data.faces()[0]
    }

    #[test]
    fn vertex_components_default_positionally() {
        let data = load_obj_from_str("v 1.0 2.0\nv 1 2 3 4 5\nv 7").unwrap();
        assert_eq!(
            data.vertices(),
            &[
                Vertex4::new(1.0, 2.0, 0.0, 1.0),
                Vertex4::new(1.0, 2.0, 3.0, 4.0),
                Vertex4::new(7.0, 0.0, 0.0, 1.0),
            ]
        );
    }

    #[test]
    fn normals_and_uvs_default_to_zero() {
        let data = load_obj_from_str("vt 0.5 0.25\nvn 0 1\nvt 1 1 1 9").unwrap();
        assert_eq!(
            data.uvs(),
            &[Vertex3::new(0.5, 0.25, 0.0), Vertex3::new(1.0, 1.0, 1.0)]
        );
        assert_eq!(data.normals(), &[Vertex3::new(0.0, 1.0, 0.0)]);
    }

    #[test]
    fn directive_without_values_is_noop() {
        let data = load_obj_from_str("v\nvn   \nvt # nothing here").unwrap();
        assert!(data.vertices().is_empty());
        assert!(data.normals().is_empty());
        assert!(data.uvs().is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let data = load_obj_from_str("# just a comment\n\n   \nv 1 1 1 # trailing\n").unwrap();
        assert_eq!(data.vertices(), &[Vertex4::new(1.0, 1.0, 1.0, 1.0)]);
        assert!(data.faces().is_empty());
        assert!(data.warnings().is_empty());
    }

    #[test]
    fn object_name_last_write_wins() {
        let data = load_obj_from_str("o first\nv 0 0 0\no second extra\no").unwrap();
        assert_eq!(data.object_name(), Some("second"));
        assert_eq!(load_obj_from_str("v 0 0 0").unwrap().object_name(), None);
    }

    #[test]
    fn face_vertex_only() {
        let face = single_face("f 1 2 3");
        assert_eq!(
            face.corners,
            [
                corner(Some(1), None, None),
                corner(Some(2), None, None),
                corner(Some(3), None, None),
            ]
        );
    }

    #[test]
    fn face_vertex_uv() {
        let face = single_face("f 1/2 3/4 5/6");
        for c in face.corners {
            assert!(c.has_vertex() && c.has_uv() && !c.has_normal());
        }
        assert_eq!(face.corners[2], corner(Some(5), Some(6), None));
    }

    #[test]
    fn face_vertex_normal_without_uv() {
        let face = single_face("f 1//3 2//4 5//6");
        assert_eq!(
            face.corners,
            [
                corner(Some(1), None, Some(3)),
                corner(Some(2), None, Some(4)),
                corner(Some(5), None, Some(6)),
            ]
        );
    }

    #[test]
    fn face_fully_populated() {
        let face = single_face("f 1/2/3 4/5/6 7/8/9");
        assert_eq!(face.corners[0], corner(Some(1), Some(2), Some(3)));
        assert_eq!(face.corners[1], corner(Some(4), Some(5), Some(6)));
        assert_eq!(face.corners[2], corner(Some(7), Some(8), Some(9)));
    }

    #[test]
    fn face_segments_are_independently_optional() {
        let face = single_face("f /2 3/ 4/5/");
        assert_eq!(face.corners[0], corner(None, Some(2), None));
        assert_eq!(face.corners[1], corner(Some(3), None, None));
        assert_eq!(face.corners[2], corner(Some(4), Some(5), None));
    }

    #[test]
    fn face_arity_must_be_three() {
        for src in ["f 1 2", "f 1 2 3 4", "f"] {
            let err = load_obj_from_str(src).unwrap_err();
            assert!(
                matches!(err, FormatError::MalformedFace { line: 1, .. }),
                "{src}: {err}"
            );
        }
    }

    #[test]
    fn bad_face_tokens_are_rejected() {
        for token in ["1/2/3/4", "-1", "1/-2", "0", "x", "1//y", "//"] {
            let src = format!("v 0 0 0\nf {token} 1 1");
            let err = load_obj_from_str(&src).unwrap_err();
            assert!(
                matches!(err, FormatError::MalformedFace { line: 2, .. }),
                "{token}: {err}"
            );
        }
    }

    #[test]
    fn invalid_float_reports_line_and_token() {
        let err = load_obj_from_str("v 0 0 0\nvn 1 nope 0").unwrap_err();
        match err {
            FormatError::InvalidNumber { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "nope");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn unknown_directives_are_reported_and_skipped() {
        let data = load_obj_from_str("mtllib a.mtl\nV 1 2 3\nv 1 2 3\nusemtl red").unwrap();
        assert_eq!(data.vertices().len(), 1);
        let lines: Vec<(usize, &str)> = data
            .warnings()
            .iter()
            .filter_map(|w| match w {
                FormatError::UnknownDirective { line, directive } => {
                    Some((*line, directive.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![(1, "mtllib"), (2, "V"), (4, "usemtl")]);
        assert!(data.warnings().iter().all(FormatError::is_recoverable));
    }

    #[test]
    fn line_length_limit() {
        let long = format!("v 1 2 3 {}", " ".repeat(DEFAULT_MAX_LINE_LEN));
        let err = load_obj_from_str(&long).unwrap_err();
        assert!(matches!(
            err,
            FormatError::LineTooLong { line: 1, max: DEFAULT_MAX_LINE_LEN, .. }
        ));

        let data = ObjParser::new()
            .with_max_line_len(4096)
            .parse_str(&long)
            .unwrap();
        assert_eq!(data.vertices().len(), 1);
    }

    #[test]
    fn non_utf8_comment_is_ignored() {
        let src: &[u8] = b"# Cr\xe9\xe9 par Blender\nv 1 2 3 # caf\xe9\n";
        let data = load_obj_from_reader(src).unwrap();
        assert_eq!(data.vertices(), &[Vertex4::new(1.0, 2.0, 3.0, 1.0)]);
    }

    #[test]
    fn non_utf8_directive_reports_line() {
        let src: &[u8] = b"v 0 0 0\nv 1 \xff 3\n";
        let err = load_obj_from_reader(src).unwrap_err();
        assert!(
            matches!(err, FormatError::InvalidText { line: 2, column: 5 }),
            "{err}"
        );
    }

    #[test]
    fn overlong_line_stops_reading_at_limit() {
        // Endless line: the reader has to give up after the limit.
        let reader = BufReader::new(io::repeat(b'a'));
        let err = load_obj_from_reader(reader).unwrap_err();
        assert!(matches!(
            err,
            FormatError::LineTooLong { line: 1, len, max: DEFAULT_MAX_LINE_LEN }
                if len == DEFAULT_MAX_LINE_LEN + 2
        ));
    }

    #[test]
    fn line_at_limit_with_crlf_is_accepted() {
        let comment = format!("#{}\r\nv 1 1 1\r\n", "x".repeat(DEFAULT_MAX_LINE_LEN - 1));
        let data = load_obj_from_str(&comment).unwrap();
        assert_eq!(data.vertices().len(), 1);
    }

    #[test]
    fn two_vertex_scenario_dereferences_to_first_and_second() {
        let data = load_obj_from_str("v 0 0 0\nv 1 1 1\nf 1 2 1\n").unwrap();
        assert_eq!(
            data.vertices(),
            &[Vertex4::new(0.0, 0.0, 0.0, 1.0), Vertex4::new(1.0, 1.0, 1.0, 1.0)]
        );
        let face = data.faces()[0];
        let resolved: Vec<Vertex4> = face
            .corners
            .iter()
            .map(|c| data.vertices()[c.vertex.unwrap() as usize - 1])
            .collect();
        assert_eq!(
            resolved,
            vec![data.vertices()[0], data.vertices()[1], data.vertices()[0]]
        );
    }

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            o tri
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let data = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(data.object_name(), Some("tri"));
        assert_eq!(data.vertices().len(), 3);
        assert_eq!(data.uvs().len(), 3);
        assert_eq!(data.normals().len(), 1);
        assert_eq!(data.faces().len(), 1);
    }

    #[test]
    fn reader_and_path_entry_points() {
        let src = "v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nf 1 2 3\r\n";
        let from_reader = load_obj_from_reader(io::Cursor::new(src)).unwrap();
        assert_eq!(from_reader.faces().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(&path, src).unwrap();
        let from_path = load_obj_from_path(&path).unwrap();
        assert_eq!(from_path.vertices(), from_reader.vertices());
        assert_eq!(from_path.faces(), from_reader.faces());

        assert!(matches!(
            load_obj_from_path(dir.path().join("missing.obj")),
            Err(FormatError::Io { .. })
        ));
    }
}
