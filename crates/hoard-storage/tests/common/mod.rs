//! Shared on-disk fixtures: a small CASC build in a loose store and a small
//! MPQ installation

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use hoard_crypto::{ContentKey, EncodingKey};
use hoard_formats::config::BuildConfig;
use hoard_formats::mpq::BlockFlags;
use hoard_formats::root::{ContentFlags, LocaleFlags};
use hoard_formats::test_support::{
    BlteBuilder, EncodingRecord, MpqBuilder, MpqFileOptions, RootBlockSpec, build_encoding,
    build_manifest_root, encrypted_chunk, zlib_chunk,
};
use hoard_storage::LooseFileStore;
use tempfile::TempDir;

pub const KEY_NAME: u64 = 0xFA50_5078_126A_CB3E;
pub const KEY_NAME_HEX: &str = "FA505078126ACB3E";
pub const KEY_HEX: &str = "BDC51862ABED79B2DE48C8E7E66C6200";
pub const BUILD_NAME: &str = "WOW-12345patch1.0.0_Test";

pub const HELLO_ID: u32 = 100;
pub const SECRET_ID: u32 = 102;
pub const MULTI_ID: u32 = 103;
pub const VARIANT_ID: u32 = 200;

pub const SECRET_PLAINTEXT: &[u8] = b"classified";

pub struct CascFixture {
    pub dir: TempDir,
    pub store: Arc<LooseFileStore>,
    pub build_config: BuildConfig,
    pub hello_ckey: ContentKey,
    pub hello_ekey: EncodingKey,
}

fn key_bytes() -> [u8; 16] {
    let mut key = [0u8; 16];
    hex::decode_to_slice(KEY_HEX, &mut key).unwrap();
    key
}

fn put(store: &LooseFileStore, frame: &[u8]) -> EncodingKey {
    let ekey = EncodingKey::from_data(frame);
    let path = store.path_for(&ekey);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, frame).unwrap();
    ekey
}

/// Build with four files for enUS and a low-violence enGB variant of one
pub fn casc_fixture() -> CascFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(LooseFileStore::new(dir.path().join("data")));

    let hello = BlteBuilder::new().raw(b"hello world").build();
    let multi = BlteBuilder::new()
        .zlib(b"first chunk ")
        .raw(b"second chunk")
        .build();
    let secret = BlteBuilder::new()
        .chunk(
            encrypted_chunk(
                &zlib_chunk(SECRET_PLAINTEXT),
                KEY_NAME,
                &key_bytes(),
                &[1, 2, 3, 4],
                b'S',
                0,
            ),
            SECRET_PLAINTEXT.len() as u32,
        )
        .build();
    let variant_a = BlteBuilder::new().raw(b"variant a").build();
    let variant_b = BlteBuilder::new().raw(b"variant b").build();

    let hello_ckey = ContentKey::from_data(b"hello world");
    let secret_ckey = ContentKey::from_data(SECRET_PLAINTEXT);
    let multi_ckey = ContentKey::from_data(b"first chunk second chunk");
    let a_ckey = ContentKey::from_data(b"variant a");
    let b_ckey = ContentKey::from_data(b"variant b");

    let root = build_manifest_root(
        5,
        5,
        &[
            RootBlockSpec::new(
                ContentFlags::NONE,
                LocaleFlags::ENUS,
                &[
                    (HELLO_ID, hello_ckey),
                    (SECRET_ID, secret_ckey),
                    (MULTI_ID, multi_ckey),
                    (VARIANT_ID, a_ckey),
                ],
            ),
            RootBlockSpec::new(
                ContentFlags::LOW_VIOLENCE,
                LocaleFlags::ENGB,
                &[(VARIANT_ID, b_ckey)],
            ),
        ],
    );
    let root_ckey = ContentKey::from_data(&root);
    let root_ekey = put(&store, &BlteBuilder::new().zlib(&root).build());

    let hello_ekey = put(&store, &hello);
    let records = vec![
        EncodingRecord::new(hello_ckey, 11, &[hello_ekey]),
        EncodingRecord::new(secret_ckey, 10, &[put(&store, &secret)]),
        EncodingRecord::new(multi_ckey, 24, &[put(&store, &multi)]),
        EncodingRecord::new(a_ckey, 9, &[put(&store, &variant_a)]),
        EncodingRecord::new(b_ckey, 9, &[put(&store, &variant_b)]),
        EncodingRecord::new(root_ckey, root.len() as u64, &[root_ekey]),
    ];
    let encoding = build_encoding(&[records], b"b:{*=z}");
    let encoding_ckey = ContentKey::from_data(&encoding);
    let encoding_ekey = put(&store, &BlteBuilder::new().zlib(&encoding).build());

    let build_config = BuildConfig::parse(&format!(
        "# Build Configuration\n\nroot = {root_ckey}\nencoding = {encoding_ckey} {encoding_ekey}\nbuild-name = {BUILD_NAME}\n"
    ));

    CascFixture {
        dir,
        store,
        build_config,
        hello_ckey,
        hello_ekey,
    }
}

pub fn sword_texture() -> Vec<u8> {
    (0..2000u32).map(|i| (i % 7) as u8).collect()
}

fn write_archive(path: &Path, builder: MpqBuilder) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, builder.build()).unwrap();
}

/// Installation with a base, a locale and a patch archive
///
/// IDs in load order: 1 sword.blp, 2 map.dbc, 3 readme.txt (patched),
/// 4 hello.wav, 5 secret.bin, 6 new.txt.
pub fn mpq_install() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    std::fs::create_dir_all(root.join("wtf")).unwrap();
    std::fs::write(
        root.join("wtf/config.wtf"),
        "SET realmList \"localhost\"\r\nSET locale \"enGB\"\r\n",
    )
    .unwrap();

    let data = root.join("Data");
    write_archive(
        &data.join("common.MPQ"),
        MpqBuilder::new()
            .file(
                "(listfile)",
                b"Interface\\Icons\\Sword.blp\r\nDBFilesClient\\Map.dbc;readme.txt\r\n",
                MpqFileOptions::default(),
            )
            .file(
                "Interface\\Icons\\Sword.blp",
                &sword_texture(),
                MpqFileOptions::compressed(),
            )
            .file(
                "DBFilesClient\\Map.dbc",
                b"WDBC map table",
                MpqFileOptions::single_unit(),
            )
            .file("readme.txt", b"base readme", MpqFileOptions::default()),
    );
    write_archive(
        &data.join("enGB").join("locale-enGB.MPQ"),
        MpqBuilder::new()
            .format_version(1)
            .file(
                "(listfile)",
                b"Sound\\hello.wav\nsecret.bin\n",
                MpqFileOptions::default(),
            )
            .file("Sound\\hello.wav", b"RIFF....WAVE", MpqFileOptions::default())
            .raw_block(
                "secret.bin",
                vec![0u8; 16],
                16,
                BlockFlags::EXISTS | BlockFlags::ENCRYPTED,
            ),
    );
    write_archive(
        &data.join("patch.MPQ"),
        MpqBuilder::new()
            .file(
                "(listfile)",
                b"readme.txt\r\nInterface\\New.txt\r\n",
                MpqFileOptions::default(),
            )
            .file("readme.txt", b"patched readme", MpqFileOptions::default())
            .file("Interface\\New.txt", b"new in patch", MpqFileOptions::compressed()),
    );

    dir
}
