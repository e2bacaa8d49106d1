//! The three reference-file flavors: contracted shell quartets, single
//! primitive quartets, and Boys function tables.
//!
//! An "input" file carries only the entry parameters; a full reference
//! file additionally carries the digit count and the computed values. Both
//! are read by the same routines, switched by `is_input`.

use super::{format_header, write_atomic, TokenReader};
use crate::error::RefintError;
use crate::shell::{quartet_size_records, PrimitiveRecord, ShellRecord};
use color_eyre::eyre::Result;
use std::path::Path;

/// One contracted quartet and its reference values (empty for inputs).
#[derive(Debug, Clone)]
pub struct IntegralEntry {
    pub shells: [ShellRecord; 4],
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IntegralFile {
    pub header: String,
    /// Significant decimal digits stored per value; 0 for input files.
    pub ndigits: usize,
    pub entries: Vec<IntegralEntry>,
}

/// One primitive quartet and its reference value (empty for inputs).
#[derive(Debug, Clone)]
pub struct SingleEntry {
    pub prims: [PrimitiveRecord; 4],
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct SingleFile {
    pub header: String,
    pub ndigits: usize,
    pub entries: Vec<SingleEntry>,
}

/// One Boys argument and the ladder F_0..F_m (empty for inputs).
#[derive(Debug, Clone)]
pub struct BoysEntry {
    pub m: u32,
    pub t: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BoysFile {
    pub header: String,
    pub ndigits: usize,
    pub entries: Vec<BoysEntry>,
}

fn read_shell(r: &mut TokenReader) -> Result<ShellRecord> {
    let z: i64 = r.next_parsed("atomic number")?;
    let am: u32 = r.next_parsed("angular momentum")?;
    if am > 100 {
        return Err(
            RefintError::MalformedFile(format!("implausible angular momentum {}", am)).into(),
        );
    }
    let xyz = [r.next()?, r.next()?, r.next()?];
    let nprim: usize = r.next_parsed("primitive count")?;
    let ngeneral: usize = r.next_parsed("general contraction count")?;
    if nprim == 0 || nprim > 10_000 || ngeneral == 0 || ngeneral > 10_000 {
        return Err(RefintError::MalformedFile(format!(
            "implausible shell dimensions nprim={} ngeneral={}",
            nprim, ngeneral
        ))
        .into());
    }
    let mut alpha = Vec::with_capacity(nprim);
    for _ in 0..nprim {
        alpha.push(r.next()?);
    }
    let mut coeff = Vec::with_capacity(nprim * ngeneral);
    for _ in 0..nprim * ngeneral {
        coeff.push(r.next()?);
    }
    let shell = ShellRecord {
        z,
        am,
        xyz,
        nprim,
        ngeneral,
        alpha,
        coeff,
    };
    shell.validate()?;
    Ok(shell)
}

fn read_ndigits(r: &mut TokenReader) -> Result<usize> {
    let ndigits: usize = r.next_parsed("digit count")?;
    if ndigits == 0 {
        return Err(RefintError::MalformedFile("digit count must be >= 1".into()).into());
    }
    Ok(ndigits)
}

/// Read a contracted-quartet file. With `is_input` the digit count and the
/// per-entry values are absent.
pub fn read_integral_file(path: &Path, is_input: bool) -> Result<IntegralFile> {
    let mut r = TokenReader::open(path)?;
    let header = r.header().to_string();
    let ndigits = if is_input { 0 } else { read_ndigits(&mut r)? };

    let mut entries = Vec::new();
    while !r.is_empty() {
        let shells = [
            read_shell(&mut r)?,
            read_shell(&mut r)?,
            read_shell(&mut r)?,
            read_shell(&mut r)?,
        ];
        let mut values = Vec::new();
        if !is_input {
            let n = quartet_size_records(&shells);
            for _ in 0..n {
                values.push(r.next()?);
            }
        }
        entries.push(IntegralEntry { shells, values });
    }
    Ok(IntegralFile {
        header,
        ndigits,
        entries,
    })
}

pub fn write_integral_file(path: &Path, file: &IntegralFile) -> Result<()> {
    let mut out = String::new();
    format_header(&mut out, &file.header);
    out.push_str(&format!("{}\n", file.ndigits));
    for entry in &file.entries {
        out.push('\n');
        for s in &entry.shells {
            out.push_str(&format!(
                "{} {} {} {} {} {} {}\n",
                s.z, s.am, s.xyz[0], s.xyz[1], s.xyz[2], s.nprim, s.ngeneral
            ));
            out.push_str(&s.alpha.join(" "));
            out.push('\n');
            out.push_str(&s.coeff.join(" "));
            out.push('\n');
        }
        for v in &entry.values {
            out.push_str(v);
            out.push('\n');
        }
    }
    write_atomic(path, &out)
}

fn read_prim(r: &mut TokenReader) -> Result<PrimitiveRecord> {
    let lmn = [
        r.next_parsed("cartesian exponent")?,
        r.next_parsed("cartesian exponent")?,
        r.next_parsed("cartesian exponent")?,
    ];
    if lmn.iter().any(|&l: &i32| l < 0) {
        return Err(RefintError::MalformedFile("negative cartesian exponent".into()).into());
    }
    let xyz = [r.next()?, r.next()?, r.next()?];
    let alpha = r.next()?;
    Ok(PrimitiveRecord { lmn, xyz, alpha })
}

/// Read a single-primitive file. With `is_input` the digit count and the
/// per-entry value are absent.
pub fn read_single_file(path: &Path, is_input: bool) -> Result<SingleFile> {
    let mut r = TokenReader::open(path)?;
    let header = r.header().to_string();
    let ndigits = if is_input { 0 } else { read_ndigits(&mut r)? };

    let mut entries = Vec::new();
    while !r.is_empty() {
        let prims = [
            read_prim(&mut r)?,
            read_prim(&mut r)?,
            read_prim(&mut r)?,
            read_prim(&mut r)?,
        ];
        let value = if is_input { String::new() } else { r.next()? };
        entries.push(SingleEntry { prims, value });
    }
    Ok(SingleFile {
        header,
        ndigits,
        entries,
    })
}

pub fn write_single_file(path: &Path, file: &SingleFile) -> Result<()> {
    let mut out = String::new();
    format_header(&mut out, &file.header);
    out.push_str(&format!("{}\n", file.ndigits));
    for entry in &file.entries {
        out.push('\n');
        for p in &entry.prims {
            out.push_str(&format!(
                "{} {} {} {} {} {} {}\n",
                p.lmn[0], p.lmn[1], p.lmn[2], p.xyz[0], p.xyz[1], p.xyz[2], p.alpha
            ));
        }
        out.push_str(&entry.value);
        out.push('\n');
    }
    write_atomic(path, &out)
}

/// Read a Boys-function file. With `is_input` the digit count and the
/// ladder values are absent.
pub fn read_boys_file(path: &Path, is_input: bool) -> Result<BoysFile> {
    let mut r = TokenReader::open(path)?;
    let header = r.header().to_string();
    let ndigits = if is_input { 0 } else { read_ndigits(&mut r)? };

    let mut entries = Vec::new();
    while !r.is_empty() {
        let m: u32 = r.next_parsed("order")?;
        if m > 1000 {
            return Err(
                RefintError::MalformedFile(format!("implausible order {}", m)).into(),
            );
        }
        let t = r.next()?;
        let mut values = Vec::new();
        if !is_input {
            for _ in 0..=m {
                values.push(r.next()?);
            }
        }
        entries.push(BoysEntry { m, t, values });
    }
    Ok(BoysFile {
        header,
        ndigits,
        entries,
    })
}

pub fn write_boys_file(path: &Path, file: &BoysFile) -> Result<()> {
    let mut out = String::new();
    format_header(&mut out, &file.header);
    out.push_str(&format!("{}\n", file.ndigits));
    for entry in &file.entries {
        out.push('\n');
        out.push_str(&format!("{} {}\n", entry.m, entry.t));
        for v in &entry.values {
            out.push_str(v);
            out.push('\n');
        }
    }
    write_atomic(path, &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tmpdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "refint-io-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn s_shell() -> ShellRecord {
        ShellRecord {
            z: 8,
            am: 1,
            xyz: ["0.0".into(), "0.0".into(), "1.5".into()],
            nprim: 2,
            ngeneral: 1,
            alpha: vec!["130.7093214".into(), "23.80886605".into()],
            coeff: vec!["1.0".into(), "0.5".into()],
        }
    }

    #[test]
    fn integral_file_round_trips() {
        let path = tmpdir().join("integral.dat");
        let shells = [s_shell(), s_shell(), s_shell(), s_shell()];
        let nvalues = quartet_size_records(&shells);
        let file = IntegralFile {
            header: "created for a test\nsecond line".into(),
            ndigits: 18,
            entries: vec![IntegralEntry {
                shells,
                values: (0..nvalues).map(|i| format!("{}.25e-2", i)).collect(),
            }],
        };
        write_integral_file(&path, &file).unwrap();
        let back = read_integral_file(&path, false).unwrap();
        assert_eq!(back.ndigits, 18);
        assert!(back.header.contains("second line"));
        assert_eq!(back.entries.len(), 1);
        assert_eq!(back.entries[0].shells[2], file.entries[0].shells[2]);
        assert_eq!(back.entries[0].values, file.entries[0].values);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn input_files_have_no_digits_or_values() {
        let path = tmpdir().join("input.inp");
        fs::write(
            &path,
            "# an input file\n\
             1 0 0.0 0.0 0.0 1 1\n1.0\n1.0\n\
             1 0 0.0 0.0 0.0 1 1\n1.0\n1.0\n\
             1 0 0.0 0.0 0.0 1 1\n1.0\n1.0\n\
             1 0 0.0 0.0 0.0 1 1\n1.0\n1.0\n",
        )
        .unwrap();
        let file = read_integral_file(&path, true).unwrap();
        assert_eq!(file.ndigits, 0);
        assert_eq!(file.entries.len(), 1);
        assert!(file.entries[0].values.is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn comments_are_stripped_anywhere() {
        let path = tmpdir().join("boys.dat");
        fs::write(
            &path,
            "# boys reference\n11\n\n2 1.5 # order and argument\n0.1\n0.2\n0.3\n",
        )
        .unwrap();
        let file = read_boys_file(&path, false).unwrap();
        assert_eq!(file.ndigits, 11);
        assert_eq!(file.entries[0].m, 2);
        assert_eq!(file.entries[0].values, vec!["0.1", "0.2", "0.3"]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn implausible_angular_momentum_is_malformed() {
        let path = tmpdir().join("huge-am.dat");
        // an am this large would overflow the cartesian component count
        fs::write(&path, "16\n1 100000 0.0 0.0 0.0 1 1\n1.0\n1.0\n").unwrap();
        let err = read_integral_file(&path, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RefintError>(),
            Some(RefintError::MalformedFile(_))
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncated_file_is_malformed() {
        let path = tmpdir().join("short.dat");
        fs::write(&path, "16\n1 0 0.0 0.0 0.0 2 1\n1.0\n").unwrap();
        let err = read_integral_file(&path, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RefintError>(),
            Some(RefintError::MalformedFile(_))
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn single_file_round_trips() {
        let path = tmpdir().join("single.dat");
        let prim = PrimitiveRecord {
            lmn: [1, 0, 2],
            xyz: ["0.1".into(), "-0.2".into(), "0.3".into()],
            alpha: "2.5".into(),
        };
        let file = SingleFile {
            header: "single primitives".into(),
            ndigits: 20,
            entries: vec![SingleEntry {
                prims: [prim.clone(), prim.clone(), prim.clone(), prim],
                value: "1.234567890123456789e-3".into(),
            }],
        };
        write_single_file(&path, &file).unwrap();
        let back = read_single_file(&path, false).unwrap();
        assert_eq!(back.entries[0].prims[0].lmn, [1, 0, 2]);
        assert_eq!(back.entries[0].value, file.entries[0].value);
        fs::remove_file(&path).unwrap();
    }
}
