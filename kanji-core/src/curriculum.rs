//! Static curriculum tables.
//!
//! Characters are grouped by the grade in which they are taught and kept in
//! teaching order. Stroke counts are filled in where the table carries them;
//! the guide loader is the authority for stroke order.

use crate::record::{CharacterRecord, Grade};

const fn record(
    character: char,
    grade: u8,
    reading: &'static str,
    meaning: &'static str,
    stroke_count: u8,
    examples: &'static [&'static str],
) -> CharacterRecord {
    CharacterRecord {
        character,
        grade: Grade::const_new(grade),
        reading,
        meaning,
        stroke_count: if stroke_count == 0 { None } else { Some(stroke_count) },
        examples,
    }
}

static GRADE_1: [CharacterRecord; 25] = [
    record('一', 1, "いち", "One", 1, &["一つ（ひとつ）", "一日（いちにち）", "一年生（いちねんせい）"]),
    record('二', 1, "に", "Two", 2, &["二つ（ふたつ）", "二日（ふつか）", "二月（にがつ）"]),
    record('三', 1, "さん", "Three", 3, &["三つ（みっつ）", "三日（みっか）", "三角（さんかく）"]),
    record('四', 1, "し", "Four", 5, &["四つ（よっつ）", "四日（よっか）", "四角（しかく）"]),
    record('五', 1, "ご", "Five", 4, &["五つ（いつつ）", "五日（いつか）", "五円（ごえん）"]),
    record('六', 1, "ろく", "Six", 4, &["六つ（むっつ）", "六日（むいか）", "六月（ろくがつ）"]),
    record('七', 1, "しち", "Seven", 2, &["七つ（ななつ）", "七日（なのか）", "七五三（しちごさん）"]),
    record('八', 1, "はち", "Eight", 2, &["八つ（やっつ）", "八日（ようか）", "八百屋（やおや）"]),
    record('九', 1, "きゅう", "Nine", 2, &["九つ（ここのつ）", "九日（ここのか）", "九月（くがつ）"]),
    record('十', 1, "じゅう", "Ten", 2, &["十（とお）", "十回（じっかい）", "十字（じゅうじ）"]),
    record('日', 1, "にち", "Day, Sun", 4, &["日よう日（にちようび）", "三日（みっか）", "朝日（あさひ）"]),
    record('月', 1, "げつ", "Month, Moon", 4, &["月（つき）", "月よう日（げつようび）", "一月（いちがつ）"]),
    record('火', 1, "か", "Fire", 4, &["火（ひ）", "火よう日（かようび）", "花火（はなび）"]),
    record('水', 1, "すい", "Water", 4, &["水（みず）", "水よう日（すいようび）", "水田（すいでん）"]),
    record('木', 1, "もく", "Tree", 4, &["木（き）", "木よう日（もくようび）", "木材（もくざい）"]),
    record('金', 1, "きん", "Gold, Money", 8, &["お金（おかね）", "金よう日（きんようび）", "金魚（きんぎょ）"]),
    record('土', 1, "ど", "Earth, Soil", 3, &["土（つち）", "土よう日（どようび）", "土手（どて）"]),
    record('山', 1, "やま", "Mountain", 3, &["山（やま）", "富士山（ふじさん）", "登山（とざん）"]),
    record('川', 1, "かわ", "River", 3, &["川（かわ）", "小川（おがわ）", "川下り（かわくだり）"]),
    record('田', 1, "た", "Rice Paddy", 5, &["田んぼ（たんぼ）", "水田（すいでん）", "山田さん（やまださん）"]),
    record('人', 1, "ひと", "Person", 2, &["人（ひと）", "日本人（にほんじん）", "大人（おとな）"]),
    record('口', 1, "くち", "Mouth", 3, &["口（くち）", "入口（いりぐち）", "出口（でぐち）"]),
    record('車', 1, "くるま", "Car", 7, &["車（くるま）", "電車（でんしゃ）", "自動車（じどうしゃ）"]),
    record('門', 1, "もん", "Gate", 8, &["門（もん）", "正門（せいもん）", "門松（かどまつ）"]),
    record('年', 1, "ねん", "Year", 6, &["一年生（いちねんせい）", "来年（らいねん）", "今年（ことし）"]),
];

static GRADE_2: [CharacterRecord; 10] = [
    record('引', 2, "ひ（く）", "Pull", 0, &["引く（ひく）", "引き算（ひきざん）", "引力（いんりょく）"]),
    record('羽', 2, "はね", "Feather", 0, &["羽（はね）", "羽毛（うもう）", "千羽鶴（せんばづる）"]),
    record('雲', 2, "くも", "Cloud", 0, &["雲（くも）", "雨雲（あまぐも）", "雲海（うんかい）"]),
    record('園', 2, "えん", "Garden", 0, &["公園（こうえん）", "動物園（どうぶつえん）", "園長（えんちょう）"]),
    record('遠', 2, "とお（い）", "Far", 0, &["遠い（とおい）", "遠足（えんそく）", "遠く（とおく）"]),
    record('何', 2, "なに", "What", 0, &["何（なに）", "何時（なんじ）", "何人（なんにん）"]),
    record('科', 2, "か", "Department", 0, &["科学（かがく）", "理科（りか）", "教科書（きょうかしょ）"]),
    record('夏', 2, "なつ", "Summer", 0, &["夏（なつ）", "夏休み（なつやすみ）", "真夏（まなつ）"]),
    record('家', 2, "いえ", "House", 0, &["家（いえ）", "家族（かぞく）", "家事（かじ）"]),
    record('歌', 2, "うた", "Song", 0, &["歌（うた）", "歌手（かしゅ）", "国歌（こっか）"]),
];

static GRADE_3: [CharacterRecord; 10] = [
    record('悪', 3, "わる（い）", "Bad", 0, &["悪い（わるい）", "悪口（わるぐち）", "悪者（わるもの）"]),
    record('安', 3, "やす（い）", "Cheap/Safe", 0, &["安い（やすい）", "安全（あんぜん）", "安心（あんしん）"]),
    record('暗', 3, "くら（い）", "Dark", 0, &["暗い（くらい）", "暗記（あんき）", "暗室（あんしつ）"]),
    record('医', 3, "い", "Doctor/Medicine", 0, &["医者（いしゃ）", "医院（いいん）", "医学（いがく）"]),
    record('委', 3, "い", "Committee", 0, &["委員（いいん）", "委任（いにん）", "委託（いたく）"]),
    record('意', 3, "い", "Mind/Meaning", 0, &["意見（いけん）", "意味（いみ）", "注意（ちゅうい）"]),
    record('育', 3, "いく", "Nurture", 0, &["育てる（そだてる）", "教育（きょういく）", "体育（たいいく）"]),
    record('員', 3, "いん", "Member", 0, &["社員（しゃいん）", "全員（ぜんいん）", "会員（かいいん）"]),
    record('院', 3, "いん", "Institution", 0, &["病院（びょういん）", "入院（にゅういん）", "大学院（だいがくいん）"]),
    record('飲', 3, "の（む）", "Drink", 0, &["飲む（のむ）", "飲み物（のみもの）", "飲食店（いんしょくてん）"]),
];

static GRADE_4: [CharacterRecord; 5] = [
    record('愛', 4, "あい", "Love", 0, &["愛（あい）", "愛犬（あいけん）", "愛国（あいこく）"]),
    record('案', 4, "あん", "Plan", 0, &["案内（あんない）", "案（あん）"]),
    record('以', 4, "い", "By means of", 0, &["以上（いじょう）", "以下（いか）"]),
    record('衣', 4, "ころも", "Clothes", 0, &["衣類（いるい）", "衣（ころも）"]),
    record('位', 4, "くらい", "Rank", 0, &["一位（いちい）", "地位（ちい）"]),
];

static GRADE_5: [CharacterRecord; 5] = [
    record('圧', 5, "あつ", "Pressure", 0, &["気圧（きあつ）", "圧力（あつりょく）"]),
    record('移', 5, "うつ（る）", "Shift", 0, &["移動（いどう）", "移る（うつる）"]),
    record('因', 5, "いん", "Cause", 0, &["原因（げんいん）", "因果（いんが）"]),
    record('永', 5, "なが（い）", "Eternal", 0, &["永久（えいきゅう）", "永い（ながい）"]),
    record('営', 5, "えい", "Manage", 0, &["営業（えいぎょう）", "経営（けいえい）"]),
];

static GRADE_6: [CharacterRecord; 5] = [
    record('異', 6, "こと", "Uncommon", 0, &["異なる（ことなる）", "異変（いへん）"]),
    record('遺', 6, "い", "Bequeath", 0, &["遺産（いさん）", "遺言（ゆいごん）"]),
    record('域', 6, "いき", "Region", 0, &["地域（ちいき）", "区域（くいき）"]),
    record('宇', 6, "う", "Eaves/Universe", 0, &["宇宙（うちゅう）"]),
    record('映', 6, "えい", "Reflect", 0, &["映画（えいが）", "映る（うつる）"]),
];

/// Characters taught in `grade`, in teaching order.
#[must_use]
pub fn characters_for_grade(grade: Grade) -> &'static [CharacterRecord] {
    match grade.get() {
        1 => &GRADE_1,
        2 => &GRADE_2,
        3 => &GRADE_3,
        4 => &GRADE_4,
        5 => &GRADE_5,
        _ => &GRADE_6,
    }
}

/// Look up a character across all grades.
#[must_use]
pub fn find_character(character: char) -> Option<&'static CharacterRecord> {
    Grade::all()
        .flat_map(characters_for_grade)
        .find(|record| record.character == character)
}
