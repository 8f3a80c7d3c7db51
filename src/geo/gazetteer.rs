//! Static place data for Kentucky: counties, cities, and the US states used
//! for disqualification.

pub const TARGET_STATE: &str = "Kentucky";
pub const TARGET_STATE_CODE: &str = "KY";

/// All 120 Kentucky counties in alphabetical (gazetteer) order.
pub const KY_COUNTIES: &[&str] = &[
    "Adair", "Allen", "Anderson", "Ballard", "Barren", "Bath", "Bell", "Boone", "Bourbon",
    "Boyd", "Boyle", "Bracken", "Breathitt", "Breckinridge", "Bullitt", "Butler", "Caldwell",
    "Calloway", "Campbell", "Carlisle", "Carroll", "Carter", "Casey", "Christian", "Clark",
    "Clay", "Clinton", "Crittenden", "Cumberland", "Daviess", "Edmonson", "Elliott", "Estill",
    "Fayette", "Fleming", "Floyd", "Franklin", "Fulton", "Gallatin", "Garrard", "Grant",
    "Graves", "Grayson", "Green", "Greenup", "Hancock", "Hardin", "Harlan", "Harrison", "Hart",
    "Henderson", "Henry", "Hickman", "Hopkins", "Jackson", "Jefferson", "Jessamine", "Johnson",
    "Kenton", "Knott", "Knox", "Larue", "Laurel", "Lawrence", "Lee", "Leslie", "Letcher",
    "Lewis", "Lincoln", "Livingston", "Logan", "Lyon", "McCracken", "McCreary", "McLean",
    "Madison", "Magoffin", "Marion", "Marshall", "Martin", "Mason", "Meade", "Menifee",
    "Mercer", "Metcalfe", "Monroe", "Montgomery", "Morgan", "Muhlenberg", "Nelson", "Nicholas",
    "Ohio", "Oldham", "Owen", "Owsley", "Pendleton", "Perry", "Pike", "Powell", "Pulaski",
    "Robertson", "Rockcastle", "Rowan", "Russell", "Scott", "Shelby", "Simpson", "Spencer",
    "Taylor", "Todd", "Trigg", "Trimble", "Union", "Warren", "Washington", "Wayne", "Webster",
    "Whitley", "Wolfe", "Woodford",
];

/// `(city, county)` for Kentucky cities and county seats.
pub const KY_CITIES: &[(&str, &str)] = &[
    ("Louisville", "Jefferson"),
    ("Lexington", "Fayette"),
    ("Bowling Green", "Warren"),
    ("Owensboro", "Daviess"),
    ("Covington", "Kenton"),
    ("Richmond", "Madison"),
    ("Georgetown", "Scott"),
    ("Florence", "Boone"),
    ("Hopkinsville", "Christian"),
    ("Nicholasville", "Jessamine"),
    ("Elizabethtown", "Hardin"),
    ("Henderson", "Henderson"),
    ("Frankfort", "Franklin"),
    ("Independence", "Kenton"),
    ("Jeffersontown", "Jefferson"),
    ("Paducah", "McCracken"),
    ("Radcliff", "Hardin"),
    ("Ashland", "Boyd"),
    ("Madisonville", "Hopkins"),
    ("Murray", "Calloway"),
    ("Erlanger", "Kenton"),
    ("Winchester", "Clark"),
    ("St. Matthews", "Jefferson"),
    ("Danville", "Boyle"),
    ("Fort Thomas", "Campbell"),
    ("Newport", "Campbell"),
    ("Shively", "Jefferson"),
    ("Shelbyville", "Shelby"),
    ("Glasgow", "Barren"),
    ("Berea", "Madison"),
    ("Bardstown", "Nelson"),
    ("Shepherdsville", "Bullitt"),
    ("Somerset", "Pulaski"),
    ("Lawrenceburg", "Anderson"),
    ("Middlesboro", "Bell"),
    ("Mayfield", "Graves"),
    ("Mount Washington", "Bullitt"),
    ("Campbellsville", "Taylor"),
    ("Paris", "Bourbon"),
    ("Versailles", "Woodford"),
    ("Alexandria", "Campbell"),
    ("London", "Laurel"),
    ("Franklin", "Simpson"),
    ("Harrodsburg", "Mercer"),
    ("Corbin", "Whitley"),
    ("Maysville", "Mason"),
    ("Morehead", "Rowan"),
    ("Hazard", "Perry"),
    ("Pikeville", "Pike"),
    ("Prestonsburg", "Floyd"),
    ("Paintsville", "Johnson"),
    ("Whitesburg", "Letcher"),
    ("Manchester", "Clay"),
    ("Jackson", "Breathitt"),
    ("Hyden", "Leslie"),
    ("Williamsburg", "Whitley"),
    ("Princeton", "Caldwell"),
    ("Russellville", "Logan"),
    ("Russell Springs", "Russell"),
    ("Russell", "Greenup"),
    ("Columbia", "Adair"),
    ("Greensburg", "Green"),
    ("Leitchfield", "Grayson"),
    ("Central City", "Muhlenberg"),
    ("Greenville", "Muhlenberg"),
    ("Cynthiana", "Harrison"),
    ("Mount Sterling", "Montgomery"),
    ("Flemingsburg", "Fleming"),
    ("Olive Hill", "Carter"),
    ("Louisa", "Lawrence"),
    ("Inez", "Martin"),
    ("Salyersville", "Magoffin"),
    ("Beattyville", "Lee"),
    ("Stanton", "Powell"),
    ("Irvine", "Estill"),
    ("Monticello", "Wayne"),
    ("Albany", "Clinton"),
    ("Burkesville", "Cumberland"),
    ("Tompkinsville", "Monroe"),
    ("Scottsville", "Allen"),
    ("Elkton", "Todd"),
    ("Cadiz", "Trigg"),
    ("Benton", "Marshall"),
    ("Calvert City", "Marshall"),
    ("Morganfield", "Union"),
    ("Hartford", "Ohio"),
    ("Beaver Dam", "Ohio"),
    ("Brandenburg", "Meade"),
    ("Hardinsburg", "Breckinridge"),
    ("Hodgenville", "Larue"),
    ("Springfield", "Washington"),
    ("Lebanon", "Marion"),
    ("Stanford", "Lincoln"),
    ("Mount Vernon", "Rockcastle"),
    ("Barbourville", "Knox"),
    ("Pineville", "Bell"),
    ("Booneville", "Owsley"),
    ("Hindman", "Knott"),
    ("West Liberty", "Morgan"),
    ("Owingsville", "Bath"),
    ("Falmouth", "Pendleton"),
    ("Williamstown", "Grant"),
    ("Owenton", "Owen"),
    ("Carrollton", "Carroll"),
    ("La Grange", "Oldham"),
    ("Taylorsville", "Spencer"),
    ("Eddyville", "Lyon"),
    ("Morgantown", "Butler"),
    ("Brownsville", "Edmonson"),
    ("Munfordville", "Hart"),
    ("Edmonton", "Metcalfe"),
    ("Jamestown", "Russell"),
    ("Vanceburg", "Lewis"),
    ("Catlettsburg", "Boyd"),
    ("Flatwoods", "Greenup"),
];

/// Cities sharing a name with a major out-of-state city, a university or a
/// brand. These always need a nearby locative cue.
pub const HIGH_AMBIGUITY_CITIES: &[&str] = &[
    "London", "Paris", "Lexington", "Georgetown", "Columbia", "Princeton", "Franklin",
    "Richmond", "Florence", "Versailles", "Winchester", "Frankfort", "Glasgow", "Manchester",
    "Independence", "Jackson", "Murray", "Hazard", "Russell", "Springfield", "Lebanon",
    "Albany", "Henderson", "Newport", "Alexandria", "Benton",
];

/// `(name, postal code)` for the 50 states and DC.
pub const US_STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

/// Case-insensitive county lookup returning the gazetteer spelling.
pub fn county_name(name: &str) -> Option<&'static str> {
    let trimmed = name
        .trim()
        .trim_end_matches(" County")
        .trim_end_matches(" county");
    KY_COUNTIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
}

/// County for a city name, case-insensitively.
pub fn county_for_city(city: &str) -> Option<&'static str> {
    KY_CITIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(city))
        .map(|(_, county)| *county)
}
